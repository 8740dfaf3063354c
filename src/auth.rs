//! Client authentication and upstream token selection.
//!
//! Two modes:
//! - **fixed key**: `default_key` and `upstream_token` both configured. Clients
//!   must present `default_key`; the upstream is called with `upstream_token`.
//! - **passthrough**: otherwise. The client's bearer token is used as the
//!   upstream token directly.

use crate::config::AuthConfig;
use crate::error::{ProxyError, Result};
use axum::http::{header, HeaderMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode<'a> {
    FixedKey {
        default_key: &'a str,
        upstream_token: &'a str,
    },
    Passthrough,
}

impl AuthConfig {
    pub fn mode(&self) -> AuthMode<'_> {
        match (self.default_key.as_deref(), self.upstream_token.as_deref()) {
            (Some(default_key), Some(upstream_token)) => AuthMode::FixedKey {
                default_key,
                upstream_token,
            },
            _ => AuthMode::Passthrough,
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme name is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Check the client key and pick the token to send upstream.
pub fn resolve_upstream_token(auth: &AuthConfig, client_key: &str) -> Result<String> {
    match auth.mode() {
        AuthMode::FixedKey {
            default_key,
            upstream_token,
        } => {
            if client_key != default_key {
                return Err(ProxyError::auth("Invalid API key."));
            }
            Ok(upstream_token.to_string())
        }
        AuthMode::Passthrough => Ok(client_key.to_string()),
    }
}
