use chrono::Utc;
use model::entities::account::{self, AccountStatus, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, sea_query::Expr,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{PortalError, Result};
use crate::ids::MonotonicClock;

/// Fields for a new directory entry.
#[derive(Clone, Debug)]
pub struct NewAccount {
    /// Login name; access requests without one get their id as a placeholder
    pub username: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub full_name: String,
    pub designation: String,
    pub status: AccountStatus,
}

/// Profile fields to merge into an existing account. `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub profile_photo: Option<String>,
    pub profile_picture_uploaded: Option<bool>,
    pub password_hash: Option<String>,
}

/// Account storage. Lookups that miss return `None`.
#[derive(Clone, Debug)]
pub struct UserDirectory {
    db: DatabaseConnection,
    clock: MonotonicClock,
}

impl UserDirectory {
    pub fn new(db: DatabaseConnection, clock: MonotonicClock) -> Self {
        Self { db, clock }
    }

    /// Find an account whose username or email equals `identifier`.
    ///
    /// An exact username match always wins. Emails are not unique, so among
    /// email matches the earliest account wins.
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, identifier: &str) -> Result<Option<account::Model>> {
        trace!("Looking up account by username");
        if let Some(found) = account::Entity::find()
            .filter(account::Column::Username.eq(identifier))
            .one(&self.db)
            .await?
        {
            return Ok(Some(found));
        }

        trace!("Falling back to email lookup");
        let found = account::Entity::find()
            .filter(account::Column::Email.eq(identifier))
            .order_by_asc(account::Column::CreatedAt)
            .order_by_asc(account::Column::Id)
            .one(&self.db)
            .await?;
        Ok(found)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<account::Model>> {
        Ok(account::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn is_username_taken(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    /// Insert a new account. A taken username is a conflict.
    #[instrument(skip(self, new_account), fields(email = %new_account.email))]
    pub async fn add(&self, new_account: NewAccount) -> Result<account::Model> {
        if let Some(username) = &new_account.username {
            if self.is_username_taken(username).await? {
                warn!("Username '{}' already exists", username);
                return Err(username_conflict(username));
            }
        }

        let (id, now) = self.clock.next_id("user");
        let username = new_account.username.unwrap_or_else(|| id.clone());
        let requested_at = (new_account.status == AccountStatus::Pending).then_some(now);

        let model = account::ActiveModel {
            id: Set(id),
            username: Set(username.clone()),
            email: Set(new_account.email),
            password_hash: Set(new_account.password_hash),
            role: Set(new_account.role),
            full_name: Set(new_account.full_name),
            designation: Set(new_account.designation),
            phone: Set(None),
            profile_photo: Set(None),
            profile_picture_uploaded: Set(false),
            status: Set(new_account.status),
            requested_at: Set(requested_at),
            approved_at: Set(None),
            created_at: Set(now),
        };

        let inserted = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, &username))?;
        info!(
            "Account created with ID: {}, username: {}, status: {:?}",
            inserted.id, inserted.username, inserted.status
        );
        Ok(inserted)
    }

    /// Pending accounts in the order they asked for access.
    pub async fn list_pending(&self) -> Result<Vec<account::Model>> {
        let pending = account::Entity::find()
            .filter(account::Column::Status.eq(AccountStatus::Pending))
            .order_by_asc(account::Column::CreatedAt)
            .order_by_asc(account::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Found {} pending accounts", pending.len());
        Ok(pending)
    }

    /// Activate a pending account under new credentials.
    ///
    /// Only a row that is still pending is touched; `None` means no such
    /// pending account exists (unknown id, or already decided).
    #[instrument(skip(self, new_password_hash))]
    pub async fn approve(
        &self,
        id: &str,
        new_username: &str,
        new_password_hash: &str,
    ) -> Result<Option<account::Model>> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::Username, Expr::value(new_username))
            .col_expr(account::Column::PasswordHash, Expr::value(new_password_hash))
            .col_expr(account::Column::Status, Expr::value(AccountStatus::Active))
            .col_expr(account::Column::ApprovedAt, Expr::value(Utc::now()))
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::Status.eq(AccountStatus::Pending))
            .exec(&self.db)
            .await
            .map_err(|e| unique_violation(e, new_username))?;

        if result.rows_affected == 0 {
            warn!("No pending account with ID {} to approve", id);
            return Ok(None);
        }

        info!("Account {} approved as '{}'", id, new_username);
        self.find_by_id(id).await
    }

    /// Remove a pending account. Returns whether one existed.
    #[instrument(skip(self))]
    pub async fn deny(&self, id: &str) -> Result<bool> {
        let result = account::Entity::delete_many()
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::Status.eq(AccountStatus::Pending))
            .exec(&self.db)
            .await?;
        debug!("Deny removed {} rows for account {}", result.rows_affected, id);
        Ok(result.rows_affected > 0)
    }

    /// Merge profile changes into the account with exactly this username.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        username: &str,
        changes: AccountChanges,
    ) -> Result<Option<account::Model>> {
        let Some(existing) = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
        else {
            warn!("Account '{}' not found for update", username);
            return Ok(None);
        };

        if let Some(new_username) = &changes.username {
            if new_username != &existing.username && self.is_username_taken(new_username).await? {
                warn!("Username '{}' already exists", new_username);
                return Err(username_conflict(new_username));
            }
        }

        let final_username = changes.username.clone().unwrap_or_else(|| existing.username.clone());
        let mut active: account::ActiveModel = existing.into();
        let mut updated_fields = Vec::new();

        if let Some(value) = changes.username {
            active.username = Set(value);
            updated_fields.push("username");
        }
        if let Some(value) = changes.email {
            active.email = Set(value);
            updated_fields.push("email");
        }
        if let Some(value) = changes.full_name {
            active.full_name = Set(value);
            updated_fields.push("full_name");
        }
        if let Some(value) = changes.phone {
            active.phone = Set(Some(value));
            updated_fields.push("phone");
        }
        if let Some(value) = changes.designation {
            active.designation = Set(value);
            updated_fields.push("designation");
        }
        if let Some(value) = changes.profile_photo {
            active.profile_photo = Set(Some(value));
            updated_fields.push("profile_photo");
        }
        if let Some(value) = changes.profile_picture_uploaded {
            active.profile_picture_uploaded = Set(value);
            updated_fields.push("profile_picture_uploaded");
        }
        if let Some(value) = changes.password_hash {
            active.password_hash = Set(Some(value));
            updated_fields.push("password");
        }

        if updated_fields.is_empty() {
            debug!("No fields to update for account '{}'", username);
            return Ok(account::Entity::find()
                .filter(account::Column::Username.eq(username))
                .one(&self.db)
                .await?);
        }

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_violation(e, &final_username))?;
        info!(
            "Account '{}' updated. Updated fields: {}",
            username,
            updated_fields.join(", ")
        );
        Ok(Some(updated))
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        Ok(account::Entity::find().count(&self.db).await?)
    }
}

fn username_conflict(username: &str) -> PortalError {
    PortalError::conflict(
        "USERNAME_ALREADY_EXISTS",
        format!("Username '{}' already exists", username),
    )
}

fn unique_violation(error: DbErr, username: &str) -> PortalError {
    match error.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => username_conflict(username),
        _ => error.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::setup_test_db;
    use tokio::task::JoinSet;

    fn active(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: Some(username.to_string()),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            role: Role::User,
            full_name: "Test Person".to_string(),
            designation: "Employee".to_string(),
            status: AccountStatus::Active,
        }
    }

    fn pending(full_name: &str) -> NewAccount {
        NewAccount {
            username: None,
            email: "new@example.com".to_string(),
            password_hash: None,
            role: Role::User,
            full_name: full_name.to_string(),
            designation: "Intern".to_string(),
            status: AccountStatus::Pending,
        }
    }

    async fn directory() -> UserDirectory {
        UserDirectory::new(setup_test_db().await, MonotonicClock::new())
    }

    #[tokio::test]
    async fn test_find_by_username_matches_email() {
        let directory = directory().await;
        directory.add(active("lash", "lash@example.com")).await.unwrap();

        let by_name = directory.find_by_username("lash").await.unwrap().unwrap();
        let by_email = directory.find_by_username("lash@example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, by_email.id);
        assert!(directory.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_match_beats_older_email_match() {
        let directory = directory().await;
        let alice = directory.add(active("alice", "alice@example.com")).await.unwrap();
        let bob = directory.add(active("bob", "bob@example.com")).await.unwrap();

        directory
            .update(
                "alice",
                AccountChanges {
                    email: Some("bob".to_string()),
                    ..AccountChanges::default()
                },
            )
            .await
            .unwrap();

        let found = directory.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.id, bob.id);
        let found = directory.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
    }

    #[tokio::test]
    async fn test_add_rejects_taken_username() {
        let directory = directory().await;
        directory.add(active("lash", "lash@example.com")).await.unwrap();

        let error = directory.add(active("lash", "other@example.com")).await.unwrap_err();
        assert_eq!(error.code(), "USERNAME_ALREADY_EXISTS");

        // A username equal to someone's email is taken too
        let error = directory.add(active("lash@example.com", "x@example.com")).await.unwrap_err();
        assert_eq!(error.code(), "USERNAME_ALREADY_EXISTS");
        assert_eq!(directory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_emails_need_not_be_unique() {
        let directory = directory().await;
        directory.add(active("first", "shared@example.com")).await.unwrap();
        directory.add(active("second", "shared@example.com")).await.unwrap();
        assert_eq!(directory.count().await.unwrap(), 2);

        let found = directory.find_by_username("shared@example.com").await.unwrap().unwrap();
        assert_eq!(found.username, "first");
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_usernames_unique() {
        let directory = directory().await;
        let mut tasks = JoinSet::new();
        for i in 0..20 {
            let directory = directory.clone();
            tasks.spawn(async move {
                directory
                    .add(active(&format!("user{}", i), &format!("user{}@example.com", i)))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(directory.count().await.unwrap(), 20);
        for i in 0..20 {
            assert!(directory.is_username_taken(&format!("user{}", i)).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_pending_accounts_listed_in_insertion_order() {
        let directory = directory().await;
        let first = directory.add(pending("Asha Nair")).await.unwrap();
        directory.add(active("lash", "lash@example.com")).await.unwrap();
        let second = directory.add(pending("Ravi Kumar")).await.unwrap();

        assert_eq!(first.username, first.id);
        assert!(first.requested_at.is_some());

        let listed: Vec<String> = directory
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_approve_only_touches_pending_accounts() {
        let directory = directory().await;
        let request = directory.add(pending("Asha Nair")).await.unwrap();

        let approved = directory
            .approve(&request.id, "asha.nair", "new-hash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approved.status, AccountStatus::Active);
        assert_eq!(approved.username, "asha.nair");
        assert_eq!(approved.password_hash.as_deref(), Some("new-hash"));
        assert!(approved.approved_at.is_some());

        // Second approval finds nothing pending
        assert!(directory.approve(&request.id, "other", "h").await.unwrap().is_none());
        assert!(directory.approve("user-missing", "x", "h").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deny_removes_pending_record() {
        let directory = directory().await;
        let request = directory.add(pending("Asha Nair")).await.unwrap();
        let member = directory.add(active("lash", "lash@example.com")).await.unwrap();

        assert!(directory.deny(&request.id).await.unwrap());
        assert!(!directory.deny(&request.id).await.unwrap());
        assert!(directory.find_by_id(&request.id).await.unwrap().is_none());

        // Active accounts are not removable through denial
        assert!(!directory.deny(&member.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let directory = directory().await;
        directory.add(active("lash", "lash@example.com")).await.unwrap();

        let updated = directory
            .update(
                "lash",
                AccountChanges {
                    phone: Some("+91 98400 00000".to_string()),
                    designation: Some("Team Lead".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.phone.as_deref(), Some("+91 98400 00000"));
        assert_eq!(updated.designation, "Team Lead");
        assert_eq!(updated.email, "lash@example.com");
        assert!(directory.update("ghost", AccountChanges::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let directory = directory().await;
        directory.add(active("lash", "lash@example.com")).await.unwrap();
        directory.add(active("hareesh", "hareesh@example.com")).await.unwrap();

        let error = directory
            .update(
                "lash",
                AccountChanges {
                    username: Some("hareesh".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(error.code(), "USERNAME_ALREADY_EXISTS");

        let unchanged = directory.find_by_username("lash").await.unwrap().unwrap();
        assert_eq!(unchanged.username, "lash");
    }
}
