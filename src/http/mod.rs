//! HTTP surface: router assembly and the shared middleware stack.

pub mod api;

use core::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{self, IntoMakeService},
};
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt as _, request_id::MakeRequestUuid, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::state::AppState;

/// Upper bound on request handling. Must outlast the longest configured fan
/// cycle; a cycle cancelled by this timeout still ends with the pin low.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the application router with middleware applied.
pub fn create_app(app_state: AppState) -> IntoMakeService<Router<()>> {
    let middleware_stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .propagate_x_request_id()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ));

    let app = api::routes()
        .with_state(app_state)
        .fallback(routing::any(|req: Request<Body>| async move {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "Unhandled request");
            StatusCode::NOT_FOUND
        }))
        .layer(middleware_stack);

    app.into_make_service()
}
