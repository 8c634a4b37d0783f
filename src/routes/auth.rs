use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{AppState, handlers::auth};

/// /auth routes. No role gate: login/register/logout must work without a
/// session, and the profile routes resolve the cookie through the `AuthUser`
/// extractor directly.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", delete(auth::logout))
        .route("/me", get(auth::me))
        .route("/edit-avatar/{id}", put(auth::edit_avatar))
        .route("/edit-id-card-photo/{id}", put(auth::edit_id_card_photo))
}
