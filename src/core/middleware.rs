//! Identity contract with the fronting auth layer.
//!
//! Authentication itself is delegated: a trusted reverse proxy (or the
//! session gateway in front of this service) authenticates the user
//! and injects identity headers. This module only extracts them.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::ApiError;

const USER_ID_HEADER: &str = "x-auth-user";
const USER_NAME_HEADER: &str = "x-auth-name";
const ADMIN_HEADER: &str = "x-auth-admin";

/// Authenticated actor as asserted by the identity provider. Role
/// (staff vs tech) is a profile concern, looked up separately; the
/// administrator flag comes from the provider and short-circuits role
/// checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(ApiError::Unauthenticated)?;

        let display_name = headers
            .get(USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let is_admin = headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            user_id,
            display_name,
            is_admin,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(user: &str, admin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(user).unwrap());
        if let Some(flag) = admin {
            headers.insert(ADMIN_HEADER, HeaderValue::from_str(flag).unwrap());
        }
        headers
    }

    #[test]
    fn extracts_identity_and_admin_flag() {
        let id = Uuid::new_v4();
        let user =
            AuthenticatedUser::from_headers(&headers_with(&id.to_string(), Some("true"))).unwrap();
        assert_eq!(user.user_id, id);
        assert!(user.is_admin);

        let user =
            AuthenticatedUser::from_headers(&headers_with(&id.to_string(), None)).unwrap();
        assert!(!user.is_admin);
    }

    #[test]
    fn missing_or_malformed_identity_is_rejected() {
        assert!(AuthenticatedUser::from_headers(&HeaderMap::new()).is_err());
        assert!(AuthenticatedUser::from_headers(&headers_with("not-a-uuid", None)).is_err());
    }
}
