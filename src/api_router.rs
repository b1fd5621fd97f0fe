use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::approvals::configure_approvals_routes;
use crate::audit::configure_audit_routes;
use crate::budgets::configure_budgets_routes;
use crate::clients::configure_clients_routes;
use crate::identity::configure_identity_routes;
use crate::intake::configure_intake_routes;
use crate::qa::configure_qa_routes;
use crate::reporting::configure_reporting_routes;
use crate::shared::state::AppState;

/// One router per module, merged here. Every route is mounted under /api and
/// carries the shared state handle.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(configure_identity_routes())
        .merge(configure_audit_routes())
        .merge(configure_intake_routes())
        .merge(configure_approvals_routes())
        .merge(configure_budgets_routes())
        .merge(configure_qa_routes())
        .merge(configure_clients_routes())
        .merge(configure_reporting_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
