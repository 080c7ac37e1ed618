//! Principal extraction.
//!
//! Authentication itself lives in the fronting layer; by the time a
//! request reaches this server, the authenticated user is carried in
//! forwarded headers. Requests without them are rejected with 401,
//! admin routes additionally require the admin role (403).

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use curio_types::UserId;

pub const USER_HEADER: &str = "x-curio-user";
pub const ROLE_HEADER: &str = "x-curio-role";

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: UserId,
    pub admin: bool,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<UserId>().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let admin = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));
        Ok(Principal { user_id, admin })
    }
}

/// A principal that has passed the admin check.
#[derive(Debug, Clone, Copy)]
pub struct AdminPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminPrincipal(principal))
    }
}
