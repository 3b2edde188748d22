//! HTTP routes for the Casting Agency API.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksClient, TokenVerifier};
use crate::config::Config;
use crate::errors::error_envelope;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, AuthState, RouteAuth};
use crate::repositories::CastingStore;
use axum::{
    http::header,
    middleware,
    response::Response,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entity store for actors, movies and associations.
    pub store: Arc<dyn CastingStore>,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Welcome message - public
/// - `/health` - Liveness check (simple "OK") - public
/// - `/ready` - Readiness check (pings the store) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/actors`, `/actors/:id` - Actor CRUD, one permission per verb
/// - `/movies`, `/movies/:id` - Movie CRUD, one permission per verb
/// - `/associate` - Link an actor to a movie (`post:movies`)
/// - JSON envelopes for unknown paths (404), unsupported verbs (405),
///   oversized bodies (413) and timeouts (408)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let jwks_client = Arc::new(JwksClient::with_ttl(
        state.config.jwks_url.clone(),
        state.config.jwks_cache_ttl,
    ));
    let verifier = Arc::new(TokenVerifier::from_config(jwks_client, &state.config));
    let auth = Arc::new(AuthState {
        verifier,
        bypass: state.config.auth_bypass,
    });

    // Public routes (no authorization)
    let public_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes. Each verb carries its own permission; routes
    // registered twice for the same path are merged by axum.
    let protected_routes = Router::new()
        .route(
            "/actors",
            guarded(get(handlers::list_actors), &auth, "get:actors"),
        )
        .route(
            "/actors",
            guarded(post(handlers::create_actor), &auth, "post:actors"),
        )
        .route(
            "/actors/:id",
            guarded(get(handlers::get_actor), &auth, "get:actors"),
        )
        .route(
            "/actors/:id",
            guarded(patch(handlers::update_actor), &auth, "patch:actors"),
        )
        .route(
            "/actors/:id",
            guarded(delete(handlers::delete_actor), &auth, "delete:actors"),
        )
        .route(
            "/movies",
            guarded(get(handlers::list_movies), &auth, "get:movies"),
        )
        .route(
            "/movies",
            guarded(post(handlers::create_movie), &auth, "post:movies"),
        )
        .route(
            "/movies/:id",
            guarded(get(handlers::get_movie), &auth, "get:movies"),
        )
        .route(
            "/movies/:id",
            guarded(patch(handlers::update_movie), &auth, "patch:movies"),
        )
        .route(
            "/movies/:id",
            guarded(delete(handlers::delete_movie), &auth, "delete:movies"),
        )
        .route(
            "/associate",
            guarded(post(handlers::associate), &auth, "post:movies"),
        )
        .with_state(state);

    let router = public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .fallback(handlers::not_found);

    with_global_layers(router, REQUEST_TIMEOUT)
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Apply the global middleware layers.
///
/// Layer order (bottom-to-top execution):
/// 1. TraceLayer - Log request details (innermost)
/// 2. TimeoutLayer - Timeout the request
/// 3. json_error_envelope - JSON body for bare error responses, including
///    the timeout's 408
/// 4. http_metrics_middleware - Record ALL responses (outermost)
fn with_global_layers(router: Router, timeout: Duration) -> Router {
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(json_error_envelope))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Require `permission` on every endpoint of `method_router`.
fn guarded(
    method_router: MethodRouter<Arc<AppState>>,
    auth: &Arc<AuthState>,
    permission: &'static str,
) -> MethodRouter<Arc<AppState>> {
    method_router.route_layer(middleware::from_fn_with_state(
        RouteAuth::new(auth.clone(), permission),
        require_permission,
    ))
}

/// Replace any non-JSON error response with the JSON error envelope.
///
/// Covers responses built outside handlers: the router's 405 (keeping
/// `Allow`), extractor rejections such as the 413 body limit, and the
/// timeout's 408.
async fn json_error_envelope(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut envelope = error_envelope(status);
    if let Some(allow) = allow {
        envelope.headers_mut().insert(header::ALLOW, allow);
    }
    envelope
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}
