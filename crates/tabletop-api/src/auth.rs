//! Authenticated principal supplied by the upstream identity proxy.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use tabletop_core::error::DomainError;

use crate::error::ApiError;

/// Header carrying the principal's stable id.
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";

/// Header carrying the principal's email, used as a fallback display name.
pub const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";

/// The caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable principal id; the host id and player ids are these.
    pub id: String,
    /// Email address, if the proxy forwarded one.
    pub email: Option<String>,
}

impl Principal {
    /// Reads the principal from request headers.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the id header is missing or blank.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, DomainError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let id = header(PRINCIPAL_ID_HEADER)
            .ok_or_else(|| DomainError::Unauthenticated("no principal on request".into()))?;

        Ok(Self {
            id,
            email: header(PRINCIPAL_EMAIL_HEADER),
        })
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers)?)
    }
}
