use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{AppState, auth::require_admin, handlers::admin};

/// /admin routes, every one behind the ADMIN gate.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/members", get(admin::list_members).post(admin::create_member))
        .route(
            "/members/{userId}",
            axum::routing::patch(admin::patch_member_status).delete(admin::delete_member),
        )
        .route("/organization-structure", post(admin::create_structure))
        .route(
            "/organization-structure/{id}",
            put(admin::update_structure).delete(admin::delete_structure),
        )
        .route("/activity-program", get(admin::list_activities))
        .route(
            "/activity-program/{id}",
            axum::routing::patch(admin::patch_activity_status),
        )
        .route("/news", get(admin::list_news).post(admin::create_news))
        .route(
            "/news/{newsId}",
            get(admin::get_news)
                .put(admin::update_news)
                .delete(admin::delete_news),
        )
        .route(
            "/news-media/{newsId}",
            post(admin::upload_news_media).put(admin::update_news_media),
        )
        .layer(middleware::from_fn_with_state(state, require_admin))
}
