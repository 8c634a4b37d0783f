use axum::{Router, routing::get};

use crate::{AppState, handlers::free};

/// /free routes: unauthenticated, world-readable data only.
pub fn router() -> Router<AppState> {
    Router::new().route("/organization-structures", get(free::list_structures))
}
