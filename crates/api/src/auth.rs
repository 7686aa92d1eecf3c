//! HTTP Basic credential check for the `/api` routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ApiError;

/// The single operator account allowed to use the API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Returns true if `headers` carry a Basic authorization for this account.
    pub fn accepts(&self, headers: &HeaderMap) -> bool {
        let Some(encoded) = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "))
        else {
            return false;
        };

        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };

        match decoded.split_once(':') {
            Some((user, password)) => user == self.user && password == self.password,
            None => false,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Rejects requests without matching credentials. A missing
/// configuration lets every request through.
pub async fn require_credentials(
    State(credentials): State<Option<Credentials>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(credentials) = &credentials
        && !credentials.accepts(request.headers())
    {
        tracing::warn!(uri = %request.uri(), "rejected request without valid credentials");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
