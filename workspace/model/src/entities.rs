//! Root for all SeaORM entity modules.
//! The portal keeps three tables: accounts, workflow requests and the
//! notification feed.

pub mod account;
pub mod notification;
pub mod request;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::notification::Entity as Notification;
    pub use super::request::Entity as Request;
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
        QueryFilter, Set,
    };
    use serde_json::json;

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn account_model(id: &str, username: &str, status: account::AccountStatus) -> account::ActiveModel {
        account::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set(None),
            role: Set(account::Role::User),
            full_name: Set("Test Person".to_string()),
            designation: Set("Employee".to_string()),
            phone: Set(None),
            profile_photo: Set(None),
            profile_picture_uploaded: Set(false),
            status: Set(status),
            requested_at: Set(None),
            approved_at: Set(None),
            created_at: Set(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        account_model("user-1", "lash", account::AccountStatus::Active)
            .insert(&db)
            .await?;
        account_model("user-2", "newcomer", account::AccountStatus::Pending)
            .insert(&db)
            .await?;

        let request = request::ActiveModel {
            id: Set("req-1".to_string()),
            request_type: Set(request::RequestType::Leave),
            title: Set("Sick leave".to_string()),
            created_by: Set("Lashmini".to_string()),
            created_by_id: Set(Some("user-1".to_string())),
            created_by_role: Set(Some("user".to_string())),
            created_by_designation: Set(Some("Employee".to_string())),
            payload: Set(json!({ "leaveType": "sick", "fromDate": "2024-02-01" })),
            target: Set(request::RequestTarget::Founder),
            status: Set(request::RequestStatus::Pending),
            forwarded_to: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&db)
        .await?;

        notification::ActiveModel {
            id: Set("notif-1".to_string()),
            notification_type: Set("request".to_string()),
            title: Set("New leave request".to_string()),
            message: Set("Lashmini submitted a leave request".to_string()),
            target_user: Set("all".to_string()),
            related_id: Set(Some(request.id.clone())),
            created_at: Set(Utc::now()),
            read: Set(false),
        }
        .insert(&db)
        .await?;

        // Read back and verify data
        let pending = Account::find()
            .filter(account::Column::Status.eq(account::AccountStatus::Pending))
            .all(&db)
            .await?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].username, "newcomer");

        let stored = Request::find_by_id("req-1").one(&db).await?.unwrap();
        assert_eq!(stored.target, request::RequestTarget::Founder);
        assert_eq!(stored.payload["leaveType"], "sick");

        let notifications = Notification::find().all(&db).await?;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].related_id.as_deref(), Some("req-1"));
        assert!(!notifications[0].read);

        Ok(())
    }

    #[tokio::test]
    async fn test_username_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        account_model("user-1", "lash", account::AccountStatus::Active)
            .insert(&db)
            .await?;
        let duplicate = account_model("user-2", "lash", account::AccountStatus::Active)
            .insert(&db)
            .await;

        assert!(duplicate.is_err());
        assert_eq!(Account::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_privileged_roles() {
        assert!(account::Role::Admin.is_privileged());
        assert!(account::Role::Founder.is_privileged());
        assert!(!account::Role::User.is_privileged());
        assert!(!account::Role::Guest.is_privileged());
    }
}
