//! Per-route authorization middleware.
//!
//! Each protected route carries its own [`RouteAuth`] naming the permission
//! it requires. The middleware verifies the bearer token, checks the
//! permission, and hands the verified claims to the handler as an
//! `Extension<Claims>`. Rejections short-circuit before the body is read.

use crate::auth::{check_permissions, extract_bearer_token, Claims, TokenVerifier};
use crate::errors::{ApiError, AuthError};
use crate::observability::metrics::record_auth_failure;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Authorization state shared by every protected route.
pub struct AuthState {
    /// Verifier bound to the configured issuer, audience and key set.
    pub verifier: Arc<TokenVerifier>,

    /// Skip verification and permission checks entirely.
    pub bypass: bool,
}

/// Middleware state for one protected route.
#[derive(Clone)]
pub struct RouteAuth {
    pub auth: Arc<AuthState>,
    pub permission: &'static str,
}

impl RouteAuth {
    pub fn new(auth: Arc<AuthState>, permission: &'static str) -> Self {
        Self { auth, permission }
    }
}

/// Require a valid bearer token granting `route.permission`.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 with `WWW-Authenticate` for a missing or malformed header, an
///   expired token, or an audience/issuer mismatch
/// - 400 for an unknown key, an unverifiable token, or a claim set without
///   `permissions`
/// - 403 if the permission is not granted
/// - 500 if the key set cannot be fetched
#[instrument(skip_all, name = "casting.middleware.auth", fields(permission = route.permission))]
pub async fn require_permission(
    State(route): State<RouteAuth>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = if route.auth.bypass {
        Claims::default()
    } else {
        authorize(&route, req.headers()).await.map_err(|e| {
            if let ApiError::Auth(err) = &e {
                record_auth_failure(err.code());
            }
            e
        })?
    };

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

async fn authorize(route: &RouteAuth, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let header = match headers.get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::MalformedHeader(
                "Authorization header must be in the format \"bearer token\".".to_string(),
            )
        })?),
        None => None,
    };

    let token = extract_bearer_token(header).map_err(|e| {
        tracing::debug!(target: "casting.middleware.auth", error = %e, "Authorization header rejected");
        e
    })?;

    let claims = route.auth.verifier.verify(token).await?;

    check_permissions(route.permission, &claims).map_err(|e| {
        tracing::debug!(
            target: "casting.middleware.auth",
            subject = %claims.subject(),
            permission = route.permission,
            error = %e,
            "Permission check failed"
        );
        e
    })?;

    Ok(claims)
}
