//! Request extractors for the verified caller and their timezone.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono_tz::Tz;
use std::convert::Infallible;

use super::error::AppError;
use super::state::AppState;
use crate::models::{resolve_timezone, Caller};

pub const TIMEZONE_HEADER: &str = "x-timezone";

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::unauthenticated("missing Authorization header"))?
            .to_str()
            .map_err(|_| AppError::unauthenticated("malformed Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthenticated("expected a Bearer token"))?;

        let caller = state
            .jwt
            .authenticate(token)
            .map_err(|e| AppError::Service(e.into()))?;
        Ok(caller)
    }
}

/// The zone named by `X-Timezone`; UTC when absent or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeZone(pub Tz);

impl<S: Send + Sync> FromRequestParts<S> for RequestTimeZone {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let name = parts
            .headers
            .get(TIMEZONE_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(RequestTimeZone(resolve_timezone(name)))
    }
}
