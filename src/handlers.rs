pub mod access_requests;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod profile;
pub mod requests;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query},
    http::request::Parts,
};
use axum_valid::{HasValidate, Valid};
use sea_orm::ActiveEnum;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{PortalError, Result};

/// JSON request body whose rejections render as a portal validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(PortalError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections render as a portal validation error.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(PortalError))]
pub struct QueryParams<T>(pub T);

impl<T: Validate> HasValidate for QueryParams<T> {
    type Validate = T;

    fn get_validate(&self) -> &T {
        &self.0
    }
}

/// Query string that is deserialized then checked with `validator`.
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Valid(QueryParams(value)) =
            Valid::<QueryParams<T>>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Parse a lower-case wire value such as `founder` or `ta` into its enum.
pub(crate) fn parse_enum<E>(field: &str, value: &str) -> Result<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&value.trim().to_lowercase())
        .map_err(|_| PortalError::validation(format!("Invalid {}: '{}'", field, value)))
}
