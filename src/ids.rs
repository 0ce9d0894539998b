use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide millisecond clock that never hands out the same stamp twice.
///
/// Record ids are `{prefix}-{stamp}`; stamps are strictly increasing, so ids are
/// unique within the process and sort in creation order.
#[derive(Clone, Debug, Default)]
pub struct MonotonicClock {
    last: Arc<AtomicI64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next stamp: the current time in milliseconds, bumped past the previous stamp if needed.
    pub fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if now > last { now } else { last + 1 })
            })
            .unwrap_or_else(|last| last);
        if now > previous { now } else { previous + 1 }
    }

    /// A fresh id and the instant it stands for.
    pub fn next_id(&self, prefix: &str) -> (String, DateTime<Utc>) {
        let stamp = self.next_stamp();
        let at = DateTime::from_timestamp_millis(stamp).unwrap_or_else(Utc::now);
        (format!("{}-{}", prefix, stamp), at)
    }
}
