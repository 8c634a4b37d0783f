use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{AppState, auth::require_member, handlers::member};

/// /member routes, every one behind the MEMBER gate.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/activity-program",
            get(member::list_activities).post(member::create_activity),
        )
        .route(
            "/activity-program/{activityId}",
            get(member::get_activity)
                .put(member::update_activity)
                .delete(member::delete_activity),
        )
        .route(
            "/activity-media/{activityId}",
            post(member::upload_activity_media).put(member::update_activity_media),
        )
        .layer(middleware::from_fn_with_state(state, require_member))
}
