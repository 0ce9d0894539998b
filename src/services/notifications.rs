use model::entities::notification;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info, instrument, trace};

use crate::error::Result;
use crate::ids::MonotonicClock;

/// Target value that every user sees.
pub const BROADCAST_TARGET: &str = "all";

#[derive(Clone, Debug)]
pub struct NewNotification {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    /// Defaults to everyone
    pub target_user: Option<String>,
    pub related_id: Option<String>,
}

/// Bounded event log. Only the newest `capacity` entries are kept.
#[derive(Clone, Debug)]
pub struct NotificationFeed {
    db: DatabaseConnection,
    clock: MonotonicClock,
    capacity: u64,
}

impl NotificationFeed {
    pub fn new(db: DatabaseConnection, clock: MonotonicClock, capacity: u64) -> Self {
        Self { db, clock, capacity }
    }

    /// Store a notification and evict whatever falls past the capacity.
    #[instrument(skip(self, new_notification), fields(notification_type = %new_notification.notification_type))]
    pub async fn publish(&self, new_notification: NewNotification) -> Result<notification::Model> {
        let (id, now) = self.clock.next_id("notif");
        let target_user = new_notification
            .target_user
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| BROADCAST_TARGET.to_string());

        let txn = self.db.begin().await?;

        let saved = notification::ActiveModel {
            id: Set(id),
            notification_type: Set(new_notification.notification_type),
            title: Set(new_notification.title),
            message: Set(new_notification.message),
            target_user: Set(target_user),
            related_id: Set(new_notification.related_id),
            created_at: Set(now),
            read: Set(false),
        }
        .insert(&txn)
        .await?;

        // The table never holds more than capacity + 1 rows here
        let ids: Vec<String> = notification::Entity::find()
            .select_only()
            .column(notification::Column::Id)
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        let evicted: Vec<String> = ids
            .into_iter()
            .skip(usize::try_from(self.capacity).unwrap_or(usize::MAX))
            .collect();

        if !evicted.is_empty() {
            trace!("Evicting {} notifications past capacity {}", evicted.len(), self.capacity);
            notification::Entity::delete_many()
                .filter(notification::Column::Id.is_in(evicted))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        info!("Notification {} published to '{}'", saved.id, saved.target_user);
        Ok(saved)
    }

    /// Newest first. With a target, only entries for that user or for everyone.
    pub async fn list(&self, target_user: Option<&str>) -> Result<Vec<notification::Model>> {
        let mut query = notification::Entity::find();
        if let Some(target) = target_user {
            query = query.filter(
                Condition::any()
                    .add(notification::Column::TargetUser.eq(target))
                    .add(notification::Column::TargetUser.eq(BROADCAST_TARGET)),
            );
        }

        let notifications = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Listing {} notifications", notifications.len());
        Ok(notifications)
    }

    /// Returns whether the notification exists.
    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn mark_all_read(&self) -> Result<u64> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::Read.eq(false))
            .exec(&self.db)
            .await?;
        debug!("Marked {} notifications as read", result.rows_affected);
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::setup_test_db;

    async fn feed(capacity: u64) -> NotificationFeed {
        NotificationFeed::new(setup_test_db().await, MonotonicClock::new(), capacity)
    }

    fn note(title: &str, target_user: Option<&str>) -> NewNotification {
        NewNotification {
            notification_type: "request".to_string(),
            title: title.to_string(),
            message: format!("{} happened", title),
            target_user: target_user.map(str::to_string),
            related_id: None,
        }
    }

    #[tokio::test]
    async fn test_feed_keeps_newest_hundred() {
        let feed = feed(100).await;
        for i in 0..105 {
            feed.publish(note(&format!("n{}", i), None)).await.unwrap();
        }

        let listed = feed.list(None).await.unwrap();
        assert_eq!(listed.len(), 100);
        assert_eq!(listed[0].title, "n104");
        assert_eq!(listed[99].title, "n5");
        for i in 0..5 {
            let title = format!("n{}", i);
            assert!(listed.iter().all(|n| n.title != title));
        }
    }

    #[tokio::test]
    async fn test_target_defaults_to_everyone() {
        let feed = feed(100).await;
        let published = feed.publish(note("hello", None)).await.unwrap();
        assert_eq!(published.target_user, "all");
        assert!(!published.read);

        let blank = feed.publish(note("blank", Some(" "))).await.unwrap();
        assert_eq!(blank.target_user, "all");
    }

    #[tokio::test]
    async fn test_list_filters_by_target() {
        let feed = feed(100).await;
        feed.publish(note("broadcast", None)).await.unwrap();
        feed.publish(note("for lash", Some("lash"))).await.unwrap();
        feed.publish(note("for ravi", Some("ravi"))).await.unwrap();

        let titles: Vec<String> = feed
            .list(Some("lash"))
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["for lash", "broadcast"]);
        assert_eq!(feed.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_mark_read() {
        let feed = feed(100).await;
        let first = feed.publish(note("one", None)).await.unwrap();
        feed.publish(note("two", None)).await.unwrap();

        assert!(feed.mark_read(&first.id).await.unwrap());
        assert!(!feed.mark_read("notif-404").await.unwrap());
        assert_eq!(feed.mark_all_read().await.unwrap(), 1);
        assert!(feed.list(None).await.unwrap().iter().all(|n| n.read));
    }
}
