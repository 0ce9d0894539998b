use chrono::{DateTime, Utc};
use model::entities::account::{self, Role};
use moka::future::Cache;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use utoipa::ToSchema;
use uuid::Uuid;

/// Who a session belongs to.
#[derive(Clone, Debug)]
pub enum SessionSubject {
    /// A directory account that passed the credential check
    Account(account::Model),
    /// A visitor who only filled in the guest form
    Guest(GuestVisitor),
}

/// Self-declared guest details. Nothing here is verified.
#[derive(Clone, Debug)]
pub struct GuestVisitor {
    pub name: String,
    pub designation: String,
    pub company: String,
    pub role_in_company: Option<String>,
    pub purpose: Option<String>,
}

/// A server-issued session.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token presented on later calls
    pub token: String,
    pub account_id: Option<String>,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub designation: Option<String>,
    pub company: Option<String>,
    pub purpose: Option<String>,
    /// True for guest sessions, which never carry a directory identity
    pub guest: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Time-bounded session tokens held in memory.
#[derive(Clone, Debug)]
pub struct SessionStore {
    cache: Cache<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    /// `cache` must be built with `time_to_live(ttl)`; `ttl` is only used to stamp `expires_at`.
    pub fn new(cache: Cache<String, Session>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub async fn issue(&self, subject: SessionSubject) -> Session {
        let issued_at = Utc::now();
        let expires_at = issued_at
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(8));
        let token = Uuid::new_v4().simple().to_string();

        let session = match subject {
            SessionSubject::Account(account) => Session {
                token: token.clone(),
                account_id: Some(account.id),
                username: account.username,
                full_name: account.full_name,
                email: account.email,
                role: account.role.to_value(),
                designation: Some(account.designation),
                company: None,
                purpose: None,
                guest: false,
                issued_at,
                expires_at,
            },
            SessionSubject::Guest(visitor) => Session {
                token: token.clone(),
                account_id: None,
                email: guest_email(&visitor.name),
                username: visitor.name.clone(),
                full_name: visitor.name,
                role: Role::Guest.to_value(),
                designation: Some(visitor.designation),
                company: Some(visitor.company),
                purpose: visitor.purpose.or(visitor.role_in_company),
                guest: true,
                issued_at,
                expires_at,
            },
        };

        debug!(username = %session.username, guest = session.guest, "Issuing session");
        self.cache.insert(token, session.clone()).await;
        session
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        trace!("Resolving session token");
        self.cache.get(token).await
    }

    /// Returns whether a live session was removed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.cache.remove(token).await.is_some()
    }
}

fn guest_email(name: &str) -> String {
    let local = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(".");
    format!("{}@guest.portal.local", local)
}
