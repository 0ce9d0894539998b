use anyhow::Result;
use config::{Config, Environment, File};
use moka::future::Cache;
use sea_orm::{Database, DatabaseConnection};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::schemas::AppState;
use crate::services::{
    access::AccessWorkflow, directory::UserDirectory, notifications::NotificationFeed,
    password::PasswordHasher, requests::RequestEngine, session::SessionStore,
};
use crate::ids::MonotonicClock;

/// Session issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Lifetime of a session token in seconds
    pub ttl_secs: u64,
    /// Upper bound on live sessions held in memory
    pub max_sessions: u64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Routing and approval rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Contact shown to people waiting for access approval
    pub access_approver_email: String,
    /// Where founder-signed requests from interns are forwarded
    pub intern_backup_approver: String,
    /// Where every other founder-signed request is forwarded
    pub default_forward_destination: String,
    /// Whether admin/founder self-registrations skip the pending queue
    pub privileged_self_registration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Maximum number of retained notifications
    pub capacity: u64,
}

/// Application settings.
///
/// Built from defaults, then an optional `portal.toml`/`portal.yaml` in the
/// working directory, then `PORTAL_*` environment variables (nested keys use
/// `__`, e.g. `PORTAL_SESSION__TTL_SECS=3600`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub request_timeout_secs: u64,
    pub session: SessionSettings,
    pub password: PasswordSettings,
    pub workflow: WorkflowSettings,
    pub notifications: NotificationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://portal.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            session: SessionSettings {
                ttl_secs: 8 * 60 * 60,
                max_sessions: 10_000,
            },
            // OWASP recommended: m=19456 (19 MiB), t=2, p=1
            password: PasswordSettings {
                memory_kib: 19_456,
                iterations: 2,
                parallelism: 1,
            },
            workflow: WorkflowSettings {
                access_approver_email: "administrator@suryas.in".to_string(),
                intern_backup_approver: "Harish – Admin Login".to_string(),
                default_forward_destination: "Admin".to_string(),
                privileged_self_registration: true,
            },
            notifications: NotificationSettings { capacity: 100 },
        }
    }
}

impl Settings {
    /// Load settings from `.env`, the optional config file and the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("portal").required(false))
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Connect to the configured database and initialize application state
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url).await?;

    build_app_state(db, settings)
}

/// Wire services around an existing connection
pub fn build_app_state(db: DatabaseConnection, settings: &Settings) -> Result<AppState> {
    let clock = MonotonicClock::new();
    let hasher = PasswordHasher::new(&settings.password)?;
    let directory = UserDirectory::new(db.clone(), clock.clone());

    let sessions = SessionStore::new(
        Cache::builder()
            .max_capacity(settings.session.max_sessions)
            .time_to_live(Duration::from_secs(settings.session.ttl_secs))
            .build(),
        Duration::from_secs(settings.session.ttl_secs),
    );

    Ok(AppState {
        db: db.clone(),
        access: AccessWorkflow::new(directory.clone(), hasher.clone(), settings.workflow.clone()),
        directory,
        hasher,
        requests: RequestEngine::new(db.clone(), clock.clone(), settings.workflow.clone()),
        notifications: NotificationFeed::new(db, clock, settings.notifications.capacity),
        sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.notifications.capacity, 100);
        assert_eq!(settings.workflow.default_forward_destination, "Admin");
        assert!(settings.workflow.privileged_self_registration);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_defaults_round_trip_through_config() {
        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default()).unwrap())
            .set_override("session.ttl_secs", 60)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();

        assert_eq!(settings.session.ttl_secs, 60);
        assert_eq!(settings.password.memory_kib, 19_456);
        assert_eq!(settings.workflow.intern_backup_approver, "Harish – Admin Login");
    }
}
