//! Request store and the approve/reject/sign state machine.
//!
//! Every transition is a conditional update that only matches a row in one
//! of the allowed source states, so of two racing decisions exactly one wins.
//! Approve and reject accept pending or founder-signed (forwarded) requests;
//! sign accepts pending ones only.

use chrono::Utc;
use model::entities::request::{self, RequestStatus, RequestTarget, RequestType};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::WorkflowSettings;
use crate::error::{PortalError, Result};
use crate::ids::MonotonicClock;

/// A submission before it is stored.
#[derive(Clone, Debug)]
pub struct NewRequest {
    pub request_type: RequestType,
    pub title: String,
    pub created_by: String,
    pub created_by_id: Option<String>,
    pub created_by_role: Option<String>,
    pub created_by_designation: Option<String>,
    pub payload: JsonValue,
    pub target: RequestTarget,
}

/// Optional narrowing applied on top of the target queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestFilter {
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
}

/// Fields a transition may rewrite besides the status.
#[derive(Clone, Debug, Default)]
pub struct TransitionExtras {
    pub target: Option<RequestTarget>,
    pub forwarded_to: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestAction {
    Approve,
    Reject,
    /// Founder countersignature; forwards the request to an admin
    Sign,
}

#[derive(Clone, Debug)]
pub struct RequestEngine {
    db: DatabaseConnection,
    clock: MonotonicClock,
    settings: WorkflowSettings,
}

impl RequestEngine {
    pub fn new(db: DatabaseConnection, clock: MonotonicClock, settings: WorkflowSettings) -> Self {
        Self { db, clock, settings }
    }

    #[instrument(skip(self, new_request), fields(request_type = ?new_request.request_type, target = ?new_request.target))]
    pub async fn create(&self, new_request: NewRequest) -> Result<request::Model> {
        if !new_request.payload.is_object() {
            return Err(PortalError::validation("payload must be a JSON object"));
        }

        let (id, now) = self.clock.next_id("req");
        let model = request::ActiveModel {
            id: Set(id),
            request_type: Set(new_request.request_type),
            title: Set(new_request.title),
            created_by: Set(new_request.created_by),
            created_by_id: Set(new_request.created_by_id),
            created_by_role: Set(new_request.created_by_role),
            created_by_designation: Set(new_request.created_by_designation),
            payload: Set(new_request.payload),
            target: Set(new_request.target),
            status: Set(RequestStatus::Pending),
            forwarded_to: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let saved = model.insert(&self.db).await?;
        info!(
            "Request created with ID: {}, type: {:?}, target: {:?}",
            saved.id, saved.request_type, saved.target
        );
        Ok(saved)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<request::Model>> {
        Ok(request::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Requests routed to `target`, oldest first. `all` lists every request.
    #[instrument(skip(self))]
    pub async fn list_by_target(
        &self,
        target: RequestTarget,
        filter: RequestFilter,
    ) -> Result<Vec<request::Model>> {
        let mut query = request::Entity::find();

        if target != RequestTarget::All {
            query = query.filter(request::Column::Target.eq(target));
        }
        if let Some(request_type) = filter.request_type {
            query = query.filter(request::Column::RequestType.eq(request_type));
        }
        if let Some(status) = filter.status {
            query = query.filter(request::Column::Status.eq(status));
        }

        let requests = query
            .order_by_asc(request::Column::CreatedAt)
            .order_by_asc(request::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Found {} requests for target {:?}", requests.len(), target);
        Ok(requests)
    }

    /// Move a request to `new_status` if its current status allows it.
    ///
    /// Unknown ids are `NotFound`; a request outside the allowed source
    /// states is a conflict and stays as it was.
    #[instrument(skip(self, extras))]
    pub async fn set_status(
        &self,
        id: &str,
        new_status: RequestStatus,
        extras: TransitionExtras,
    ) -> Result<request::Model> {
        let mut update = request::Entity::update_many()
            .col_expr(request::Column::Status, Expr::value(new_status))
            .col_expr(request::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(target) = extras.target {
            update = update.col_expr(request::Column::Target, Expr::value(target));
        }
        if let Some(forwarded_to) = extras.forwarded_to {
            update = update.col_expr(request::Column::ForwardedTo, Expr::value(forwarded_to));
        }

        let result = update
            .filter(request::Column::Id.eq(id))
            .filter(request::Column::Status.is_in(transition_sources(new_status).iter().copied()))
            .exec(&self.db)
            .await?;
        trace!("Transition matched {} rows", result.rows_affected);

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("Request {} not found", id)))?;

        if result.rows_affected == 0 {
            warn!("Request {} is {:?}, cannot move to {:?}", id, current.status, new_status);
            return Err(invalid_transition(&current));
        }

        info!("Request {} moved to {:?}", id, new_status);
        Ok(current)
    }

    /// Apply an approver's action to a request.
    #[instrument(skip(self))]
    pub async fn apply(&self, id: &str, action: RequestAction) -> Result<request::Model> {
        match action {
            RequestAction::Approve => {
                self.set_status(id, RequestStatus::Approved, TransitionExtras::default())
                    .await
            }
            RequestAction::Reject => {
                self.set_status(id, RequestStatus::Rejected, TransitionExtras::default())
                    .await
            }
            RequestAction::Sign => {
                let current = self
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| PortalError::not_found(format!("Request {} not found", id)))?;

                if current.status != RequestStatus::Pending {
                    return Err(invalid_transition(&current));
                }
                if current.target != RequestTarget::Founder {
                    warn!("Request {} is routed to {:?}, not the founder", id, current.target);
                    return Err(PortalError::conflict(
                        "INVALID_TRANSITION",
                        format!("Request {} is not awaiting a founder signature", id),
                    ));
                }

                let forwarded_to =
                    forward_destination(current.created_by_designation.as_deref(), &self.settings);
                debug!("Forwarding request {} to '{}'", id, forwarded_to);
                self.set_status(
                    id,
                    RequestStatus::Forwarded,
                    TransitionExtras {
                        target: Some(RequestTarget::Admin),
                        forwarded_to: Some(forwarded_to),
                    },
                )
                .await
            }
        }
    }
}

/// Interns' signed requests go to the backup approver, everyone else's to
/// the default destination.
pub fn forward_destination(designation: Option<&str>, settings: &WorkflowSettings) -> String {
    let is_intern = designation
        .map(|d| d.to_lowercase().contains("intern"))
        .unwrap_or(false);
    if is_intern {
        settings.intern_backup_approver.clone()
    } else {
        settings.default_forward_destination.clone()
    }
}

/// States a request may leave for `target`.
fn transition_sources(target: RequestStatus) -> &'static [RequestStatus] {
    match target {
        RequestStatus::Approved | RequestStatus::Rejected => {
            &[RequestStatus::Pending, RequestStatus::Forwarded]
        }
        RequestStatus::Forwarded => &[RequestStatus::Pending],
        RequestStatus::Pending => &[],
    }
}

fn invalid_transition(current: &request::Model) -> PortalError {
    PortalError::conflict(
        "INVALID_TRANSITION",
        format!(
            "Request {} is already {}",
            current.id,
            current.status.to_value()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::test_utils::test_utils::setup_test_db;
    use serde_json::json;

    async fn engine() -> RequestEngine {
        RequestEngine::new(
            setup_test_db().await,
            MonotonicClock::new(),
            Settings::default().workflow,
        )
    }

    fn new_request(target: RequestTarget, designation: &str) -> NewRequest {
        NewRequest {
            request_type: RequestType::Leave,
            title: "Leave request".to_string(),
            created_by: "Lash".to_string(),
            created_by_id: Some("user-1".to_string()),
            created_by_role: Some("user".to_string()),
            created_by_designation: Some(designation.to_string()),
            payload: json!({ "from": "2024-10-01", "to": "2024-10-03", "reason": "Family" }),
            target,
        }
    }

    #[test]
    fn test_forward_destination() {
        let settings = Settings::default().workflow;
        assert_eq!(
            forward_destination(Some("Marketing Intern"), &settings),
            "Harish – Admin Login"
        );
        assert_eq!(forward_destination(Some("INTERNSHIP lead"), &settings), "Harish – Admin Login");
        assert_eq!(forward_destination(Some("Senior Engineer"), &settings), "Admin");
        assert_eq!(forward_destination(None, &settings), "Admin");
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let engine = engine().await;
        let created = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();

        assert!(created.id.starts_with("req-"));
        assert_eq!(created.status, RequestStatus::Pending);
        assert_eq!(created.payload["reason"], "Family");
        assert!(created.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_payload() {
        let engine = engine().await;
        let mut request = new_request(RequestTarget::Admin, "Engineer");
        request.payload = json!(["not", "an", "object"]);

        let error = engine.create(request).await.unwrap_err();
        assert_eq!(error.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_admin_requests_never_reach_founder_queue() {
        let engine = engine().await;
        let admin = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();
        let founder = engine.create(new_request(RequestTarget::Founder, "Engineer")).await.unwrap();

        let founder_queue = engine
            .list_by_target(RequestTarget::Founder, RequestFilter::default())
            .await
            .unwrap();
        assert_eq!(founder_queue.len(), 1);
        assert_eq!(founder_queue[0].id, founder.id);

        let everything: Vec<String> = engine
            .list_by_target(RequestTarget::All, RequestFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(everything, vec![admin.id, founder.id]);
    }

    #[tokio::test]
    async fn test_list_filters_by_type_and_status() {
        let engine = engine().await;
        let leave = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();
        let mut claim = new_request(RequestTarget::Admin, "Engineer");
        claim.request_type = RequestType::Ta;
        let claim = engine.create(claim).await.unwrap();
        engine.apply(&claim.id, RequestAction::Approve).await.unwrap();

        let claims = engine
            .list_by_target(
                RequestTarget::Admin,
                RequestFilter {
                    request_type: Some(RequestType::Ta),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].id, claim.id);

        let pending = engine
            .list_by_target(
                RequestTarget::Admin,
                RequestFilter {
                    request_type: None,
                    status: Some(RequestStatus::Pending),
                },
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, leave.id);
    }

    #[tokio::test]
    async fn test_decided_request_cannot_change_again() {
        let engine = engine().await;
        let created = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();

        let approved = engine.apply(&created.id, RequestAction::Approve).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert!(approved.updated_at.is_some());

        let error = engine.apply(&created.id, RequestAction::Reject).await.unwrap_err();
        assert_eq!(error.code(), "INVALID_TRANSITION");

        let current = engine.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_signed_request_can_be_decided_once() {
        let engine = engine().await;
        let created = engine
            .create(new_request(RequestTarget::Founder, "Marketing Intern"))
            .await
            .unwrap();

        engine.apply(&created.id, RequestAction::Sign).await.unwrap();
        let error = engine.apply(&created.id, RequestAction::Sign).await.unwrap_err();
        assert_eq!(error.code(), "INVALID_TRANSITION");

        let approved = engine.apply(&created.id, RequestAction::Approve).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.target, RequestTarget::Admin);
        assert_eq!(approved.forwarded_to.as_deref(), Some("Harish – Admin Login"));

        let error = engine.apply(&created.id, RequestAction::Reject).await.unwrap_err();
        assert_eq!(error.code(), "INVALID_TRANSITION");
        assert_eq!(
            error.to_string(),
            format!("Request {} is already approved", created.id)
        );

        let current = engine.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let engine = engine().await;
        for action in [RequestAction::Approve, RequestAction::Reject, RequestAction::Sign] {
            let error = engine.apply("req-404", action).await.unwrap_err();
            assert_eq!(error.code(), "NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn test_concurrent_decisions_have_one_winner() {
        let engine = engine().await;
        let created = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();

        let (approve, reject) = tokio::join!(
            engine.apply(&created.id, RequestAction::Approve),
            engine.apply(&created.id, RequestAction::Reject)
        );
        assert_eq!(
            [approve.is_ok(), reject.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_sign_forwards_by_designation() {
        let engine = engine().await;
        let intern = engine
            .create(new_request(RequestTarget::Founder, "Marketing Intern"))
            .await
            .unwrap();
        let senior = engine
            .create(new_request(RequestTarget::Founder, "Senior Engineer"))
            .await
            .unwrap();

        let signed = engine.apply(&intern.id, RequestAction::Sign).await.unwrap();
        assert_eq!(signed.status, RequestStatus::Forwarded);
        assert_eq!(signed.target, RequestTarget::Admin);
        assert_eq!(signed.forwarded_to.as_deref(), Some("Harish – Admin Login"));

        let signed = engine.apply(&senior.id, RequestAction::Sign).await.unwrap();
        assert_eq!(signed.forwarded_to.as_deref(), Some("Admin"));
    }

    #[tokio::test]
    async fn test_sign_requires_founder_target() {
        let engine = engine().await;
        let created = engine.create(new_request(RequestTarget::Admin, "Engineer")).await.unwrap();

        let error = engine.apply(&created.id, RequestAction::Sign).await.unwrap_err();
        assert_eq!(error.code(), "INVALID_TRANSITION");

        let current = engine.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::Pending);
        assert_eq!(current.forwarded_to, None);
    }
}
