//! Acting user extractor
//!
//! Authentication happens upstream; the authenticated email arrives in the
//! `x-user-email` header. Requests without it act as `anonymous`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const USER_HEADER: &str = "x-user-email";
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl ActingUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(ANONYMOUS);

        Ok(ActingUser(email.to_string()))
    }
}
