use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::{Actor, Role, UserId};
use crate::utils::error::AppError;

/// Set by the authentication proxy in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Missing user identity".to_string()))?
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError("Malformed user identity".to_string()))?;

        let role = match header(parts, USER_ROLE_HEADER) {
            None => Role::Regular,
            Some(role) => role
                .parse()
                .map_err(|_| AppError::AuthError(format!("Unknown role '{role}'")))?,
        };

        Ok(Actor {
            user_id: UserId(user_id),
            role,
        })
    }
}
