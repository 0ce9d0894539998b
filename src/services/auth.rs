use chrono::{DateTime, Utc};
use model::entities::account::{self, AccountStatus, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{AuthError, PortalError, Result};
use crate::services::directory::UserDirectory;
use crate::services::password::PasswordHasher;
use crate::services::session::{GuestVisitor, Session, SessionStore, SessionSubject};

/// Account fields safe to hand back to a client.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    #[schema(value_type = String, example = "user")]
    pub role: Role,
    pub full_name: String,
    pub designation: String,
    pub phone: Option<String>,
    pub profile_photo: Option<String>,
    pub profile_picture_uploaded: bool,
    #[schema(value_type = String, example = "active")]
    pub status: AccountStatus,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<account::Model> for PublicAccount {
    fn from(model: account::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            full_name: model.full_name,
            designation: model.designation,
            phone: model.phone,
            profile_photo: model.profile_photo,
            profile_picture_uploaded: model.profile_picture_uploaded,
            status: model.status,
            requested_at: model.requested_at,
            approved_at: model.approved_at,
            created_at: model.created_at,
        }
    }
}

/// Check a username (or email) and password against the directory.
///
/// Unknown identifiers, accounts without a password and wrong passwords all
/// fail the same way. Only a correct password reveals that an account is not
/// yet active.
#[instrument(skip(directory, hasher, password))]
pub async fn login(
    directory: &UserDirectory,
    hasher: &PasswordHasher,
    identifier: &str,
    password: &str,
) -> Result<account::Model> {
    let Some(account) = directory.find_by_username(identifier).await? else {
        warn!("Login failed: no account for '{}'", identifier);
        return Err(AuthError::InvalidCredentials.into());
    };

    let Some(hash) = account.password_hash.as_deref() else {
        warn!("Login failed: account {} has no password yet", account.id);
        return Err(AuthError::InvalidCredentials.into());
    };

    if !hasher.verify(password, hash).await? {
        warn!("Login failed: wrong password for account {}", account.id);
        return Err(AuthError::InvalidCredentials.into());
    }

    if account.status != AccountStatus::Active {
        warn!("Login refused: account {} is {:?}", account.id, account.status);
        return Err(AuthError::AccountInactive.into());
    }

    info!("Account {} logged in as {:?}", account.username, account.role);
    Ok(account)
}

/// Open an anonymous guest session. Nothing is looked up or verified; the
/// session role is always guest.
pub async fn guest_login(sessions: &SessionStore, visitor: GuestVisitor) -> Result<Session> {
    let visitor = GuestVisitor {
        name: required(visitor.name, "name")?,
        designation: required(visitor.designation, "designation")?,
        company: required(visitor.company, "company")?,
        role_in_company: optional(visitor.role_in_company),
        purpose: optional(visitor.purpose),
    };
    debug!("Guest login for '{}' from {}", visitor.name, visitor.company);
    Ok(sessions.issue(SessionSubject::Guest(visitor)).await)
}

fn required(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::validation(format!("Invalid or missing fields: {}", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
