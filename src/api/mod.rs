// REST API: auth endpoints behind the request gate

pub mod gate;
pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::SessionService;

pub use gate::{CurrentUser, PublicRoutes, request_gate};
pub use response::{ApiResponse, Meta, ResponseCode, Status};

/// Shared handler state. Cloned per request; everything inside is immutable
/// or a database handle.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub public_routes: Arc<PublicRoutes>,
}

impl AppState {
    pub fn new(sessions: SessionService, public_routes: PublicRoutes) -> Self {
        Self {
            sessions,
            public_routes: Arc::new(public_routes),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/logout-all", post(handlers::logout_all))
        .route("/me", get(handlers::me));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/health", get(handlers::health_check))
        // The fallback is added before the gate so unknown /api paths are gated too
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), request_gate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
