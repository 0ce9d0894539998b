//! Self-registration and administrator sign-off for new accounts.

use model::entities::account::{self, AccountStatus, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::config::WorkflowSettings;
use crate::error::{PortalError, Result};
use crate::services::directory::{NewAccount, UserDirectory};
use crate::services::password::PasswordHasher;

/// A self-registration with chosen credentials.
#[derive(Clone, Debug)]
pub struct RegisterAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub designation: String,
}

/// A request for access that leaves credentials to the approver.
#[derive(Clone, Debug)]
pub struct AccessRequest {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub designation: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Approve,
    Deny,
}

/// Credentials generated on approval. The plaintext password is only ever
/// handed out here.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Clone, Debug)]
pub enum DecisionOutcome {
    Approved(IssuedCredentials),
    Denied,
}

#[derive(Clone, Debug)]
pub struct AccessWorkflow {
    directory: UserDirectory,
    hasher: PasswordHasher,
    settings: WorkflowSettings,
    // Held across username derivation and the approve write
    approval_lock: Arc<Mutex<()>>,
}

impl AccessWorkflow {
    pub fn new(directory: UserDirectory, hasher: PasswordHasher, settings: WorkflowSettings) -> Self {
        Self {
            directory,
            hasher,
            settings,
            approval_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Contact shown to people waiting on a decision.
    pub fn approver(&self) -> &str {
        &self.settings.access_approver_email
    }

    /// Create an account from a registration form.
    ///
    /// Admin and founder registrations become active at once while
    /// `privileged_self_registration` is enabled; everyone else waits in the
    /// pending queue.
    #[instrument(skip(self, registration), fields(username = %registration.username, role = ?registration.role))]
    pub async fn register(&self, registration: RegisterAccount) -> Result<account::Model> {
        if registration.role == Role::Guest {
            return Err(PortalError::validation(
                "Guest accounts cannot be registered; use guest login",
            ));
        }

        if registration.username.trim().is_empty() || registration.password.is_empty() {
            return Err(PortalError::validation("Username and password are required"));
        }

        if self.directory.is_username_taken(&registration.username).await? {
            warn!("Registration rejected, username '{}' is taken", registration.username);
            return Err(PortalError::conflict(
                "USERNAME_ALREADY_EXISTS",
                format!("Username '{}' already exists", registration.username),
            ));
        }

        let status = if registration.role.is_privileged() && self.settings.privileged_self_registration {
            warn!(
                "Privileged self-registration for '{}' as {:?} is active immediately",
                registration.username, registration.role
            );
            AccountStatus::Active
        } else {
            AccountStatus::Pending
        };

        let password_hash = self.hasher.hash(&registration.password).await?;
        self.directory
            .add(NewAccount {
                username: Some(registration.username),
                email: registration.email,
                password_hash: Some(password_hash),
                role: registration.role,
                full_name: registration.full_name,
                designation: registration.designation,
                status,
            })
            .await
    }

    /// Queue an access request. The record gets its id as a placeholder
    /// username and no password until approved.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn request_access(&self, request: AccessRequest) -> Result<account::Model> {
        if request.role == Role::Guest {
            return Err(PortalError::validation("Guests do not need an account"));
        }

        let pending = self
            .directory
            .add(NewAccount {
                username: None,
                email: request.email,
                password_hash: None,
                role: request.role,
                full_name: request.full_name,
                designation: request.designation,
                status: AccountStatus::Pending,
            })
            .await?;
        info!("Access requested, pending account {}", pending.id);
        Ok(pending)
    }

    pub async fn list_pending(&self) -> Result<Vec<account::Model>> {
        self.directory.list_pending().await
    }

    /// Approve or deny a pending account.
    #[instrument(skip(self))]
    pub async fn decide(&self, pending_id: &str, decision: AccessDecision) -> Result<DecisionOutcome> {
        let _guard = self.approval_lock.lock().await;
        trace!("Acquired approval lock");

        let pending = match self.directory.find_by_id(pending_id).await? {
            Some(account) if account.status == AccountStatus::Pending => account,
            _ => {
                warn!("Pending account {} not found", pending_id);
                return Err(PortalError::not_found(format!(
                    "Pending account {} not found",
                    pending_id
                )));
            }
        };

        match decision {
            AccessDecision::Deny => {
                if !self.directory.deny(pending_id).await? {
                    return Err(PortalError::not_found(format!(
                        "Pending account {} not found",
                        pending_id
                    )));
                }
                info!("Access request {} denied", pending_id);
                Ok(DecisionOutcome::Denied)
            }
            AccessDecision::Approve => {
                let base_source = if pending.full_name.trim().is_empty() {
                    &pending.email
                } else {
                    &pending.full_name
                };
                let username = self.available_username(base_source).await?;
                let password = default_password(&pending.full_name);
                let password_hash = self.hasher.hash(&password).await?;

                let approved = self
                    .directory
                    .approve(pending_id, &username, &password_hash)
                    .await?
                    .ok_or_else(|| {
                        PortalError::not_found(format!("Pending account {} not found", pending_id))
                    })?;

                info!("Access request {} approved as '{}'", pending_id, username);
                Ok(DecisionOutcome::Approved(IssuedCredentials {
                    username,
                    password,
                    email: approved.email,
                    full_name: approved.full_name,
                }))
            }
        }
    }

    async fn available_username(&self, source: &str) -> Result<String> {
        let base = normalize_base_username(source);
        if !self.directory.is_username_taken(&base).await? {
            return Ok(base);
        }

        let mut counter = 1u32;
        loop {
            let candidate = format!("{}{}", base, counter);
            if !self.directory.is_username_taken(&candidate).await? {
                debug!("Username '{}' taken, using '{}'", base, candidate);
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

/// Lower-case, keep ASCII letters, digits and whitespace, then join the words with dots.
pub fn normalize_base_username(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join(".");
    if joined.is_empty() {
        "user".to_string()
    } else {
        joined
    }
}

/// First word of the full name followed by `@123`.
pub fn default_password(full_name: &str) -> String {
    let first = full_name.split_whitespace().next().unwrap_or("User");
    format!("{}@123", first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PasswordSettings, Settings};
    use crate::ids::MonotonicClock;
    use crate::test_utils::test_utils::setup_test_db;

    async fn workflow_with(settings: WorkflowSettings) -> AccessWorkflow {
        let directory = UserDirectory::new(setup_test_db().await, MonotonicClock::new());
        let hasher = PasswordHasher::new(&PasswordSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        AccessWorkflow::new(directory, hasher, settings)
    }

    async fn workflow() -> AccessWorkflow {
        workflow_with(Settings::default().workflow).await
    }

    fn registration(username: &str, role: Role) -> RegisterAccount {
        RegisterAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "secret@123".to_string(),
            full_name: "Test Person".to_string(),
            role,
            designation: "User".to_string(),
        }
    }

    fn access_request(full_name: &str) -> AccessRequest {
        AccessRequest {
            full_name: full_name.to_string(),
            email: "someone@example.com".to_string(),
            role: Role::User,
            designation: "Marketing Intern".to_string(),
        }
    }

    #[test]
    fn test_normalize_base_username() {
        assert_eq!(normalize_base_username("John Q. Public"), "john.q.public");
        assert_eq!(normalize_base_username("  Sarah   O'Neil "), "sarah.oneil");
        assert_eq!(normalize_base_username("!!!"), "user");
        assert_eq!(normalize_base_username(""), "user");
        assert_eq!(normalize_base_username("Agent 007"), "agent.007");
    }

    #[test]
    fn test_default_password() {
        assert_eq!(default_password("Sarah O'Neil"), "Sarah@123");
        assert_eq!(default_password("  Ravi  "), "Ravi@123");
        assert_eq!(default_password(""), "User@123");
    }

    #[tokio::test]
    async fn test_user_registration_is_pending() {
        let workflow = workflow().await;
        let account = workflow.register(registration("ravi", Role::User)).await.unwrap();
        assert_eq!(account.status, AccountStatus::Pending);
        assert!(account.password_hash.unwrap().starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_privileged_registration_follows_setting() {
        let workflow = workflow().await;
        let founder = workflow.register(registration("boss", Role::Founder)).await.unwrap();
        assert_eq!(founder.status, AccountStatus::Active);

        let mut settings = Settings::default().workflow;
        settings.privileged_self_registration = false;
        let strict = workflow_with(settings).await;
        let admin = strict.register(registration("admin", Role::Admin)).await.unwrap();
        assert_eq!(admin.status, AccountStatus::Pending);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username_and_guest_role() {
        let workflow = workflow().await;
        workflow.register(registration("ravi", Role::User)).await.unwrap();

        let error = workflow.register(registration("ravi", Role::User)).await.unwrap_err();
        assert_eq!(error.code(), "USERNAME_ALREADY_EXISTS");

        let error = workflow.register(registration("visitor", Role::Guest)).await.unwrap_err();
        assert_eq!(error.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_approval_resolves_username_collisions() {
        let workflow = workflow().await;
        workflow.register(registration("john.q.public", Role::User)).await.unwrap();

        let first = workflow.request_access(access_request("John Q. Public")).await.unwrap();
        let second = workflow.request_access(access_request("John Q. Public")).await.unwrap();

        let DecisionOutcome::Approved(credentials) =
            workflow.decide(&first.id, AccessDecision::Approve).await.unwrap()
        else {
            panic!("expected approval");
        };
        assert_eq!(credentials.username, "john.q.public1");
        assert_eq!(credentials.password, "John@123");

        let DecisionOutcome::Approved(credentials) =
            workflow.decide(&second.id, AccessDecision::Approve).await.unwrap()
        else {
            panic!("expected approval");
        };
        assert_eq!(credentials.username, "john.q.public2");
    }

    #[tokio::test]
    async fn test_approval_issues_usable_credentials() {
        let workflow = workflow().await;
        let pending = workflow.request_access(access_request("Sarah O'Neil")).await.unwrap();
        assert_eq!(pending.username, pending.id);
        assert!(pending.password_hash.is_none());

        let DecisionOutcome::Approved(credentials) =
            workflow.decide(&pending.id, AccessDecision::Approve).await.unwrap()
        else {
            panic!("expected approval");
        };
        assert_eq!(credentials.username, "sarah.oneil");
        assert_eq!(credentials.password, "Sarah@123");
        assert_eq!(credentials.full_name, "Sarah O'Neil");

        let account = workflow.directory.find_by_username("sarah.oneil").await.unwrap().unwrap();
        assert_eq!(account.status, AccountStatus::Active);
        assert!(
            workflow
                .hasher
                .verify("Sarah@123", account.password_hash.as_deref().unwrap())
                .await
                .unwrap()
        );
        assert!(workflow.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decisions_on_unknown_or_decided_accounts_are_not_found() {
        let workflow = workflow().await;
        let error = workflow.decide("user-404", AccessDecision::Approve).await.unwrap_err();
        assert_eq!(error.code(), "NOT_FOUND");

        let pending = workflow.request_access(access_request("Asha Nair")).await.unwrap();
        assert!(matches!(
            workflow.decide(&pending.id, AccessDecision::Deny).await.unwrap(),
            DecisionOutcome::Denied
        ));
        let error = workflow.decide(&pending.id, AccessDecision::Deny).await.unwrap_err();
        assert_eq!(error.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_concurrent_approvals_get_distinct_usernames() {
        let workflow = workflow().await;
        let first = workflow.request_access(access_request("Asha Nair")).await.unwrap();
        let second = workflow.request_access(access_request("Asha Nair")).await.unwrap();

        let (a, b) = tokio::join!(
            workflow.decide(&first.id, AccessDecision::Approve),
            workflow.decide(&second.id, AccessDecision::Approve)
        );
        let usernames: Vec<String> = [a.unwrap(), b.unwrap()]
            .into_iter()
            .map(|outcome| match outcome {
                DecisionOutcome::Approved(credentials) => credentials.username,
                DecisionOutcome::Denied => panic!("expected approval"),
            })
            .collect();
        assert_ne!(usernames[0], usernames[1]);
        assert!(usernames.contains(&"asha.nair".to_string()));
        assert!(usernames.contains(&"asha.nair1".to_string()));
    }
}
