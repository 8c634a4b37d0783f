use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{
        AuthUser, SESSION_COOKIE, SESSION_TTL_HOURS, clear_session_cookie, hash_password,
        session_cookie, verify_password,
    },
    error::ApiError,
    media::{MediaManager, storage_key},
    models::{Identity, LoginRequest, RegisterRequest, Role, User},
    storage::{BUCKET_AVATARS, BUCKET_CREDENTIALS},
};

use super::MultipartForm;

/// Shared registration validation: a human-looking name of at least three
/// characters, a plausible email, a password of at least six characters.
/// Any miss collapses to the same generic 400 body.
pub(super) fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let name_ok = req.name.trim().len() >= 3
        && req
            .name
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace());
    let email_ok = req.email.contains('@') && req.email.contains('.');
    let password_ok = req.password.len() >= 6;

    if name_ok && email_ok && password_ok {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid field requirement".to_string()))
    }
}

/// Builds the user row for a validated registration request. The password is
/// hashed here; the caller only ever holds the PHC string.
pub(super) fn build_user(req: &RegisterRequest) -> Result<User, ApiError> {
    Ok(User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email: req.email.to_lowercase(),
        password_hash: hash_password(&req.password)?,
        role: req.role.unwrap_or(Role::Member),
        address: req.address.clone(),
        program_type: req.program_type,
        ..Default::default()
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created, cookie set"),
        (status = 400, description = "Missing email or password"),
        (status = 404, description = "Unknown email or wrong password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Invalid field requirement".to_string()));
    }

    // Unknown email and wrong password answer identically.
    let user = state
        .repo
        .find_user_by_email(&req.email.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid credentials".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::NotFound("Invalid credentials".to_string()));
    }

    let token = state
        .auth
        .create_session(user.id, SESSION_TTL_HOURS)
        .await?;

    tracing::info!(user_id = %user.id, "login");

    Ok((
        jar.add(session_cookie(token, &state.config.env)),
        Json(json!({
            "message": "Login successful",
            "user": Identity { id: user.id, name: user.name, email: user.email, role: user.role },
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, session cookie set"),
        (status = 400, description = "Field validation failed"),
        (status = 409, description = "Email already in use")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&req)?;

    if state
        .repo
        .find_user_by_email(&req.email.to_lowercase())
        .await?
        .is_some()
    {
        return Err(ApiError::EmailInUse);
    }

    let user = state.repo.create_user(build_user(&req)?).await?;
    let token = state
        .auth
        .create_session(user.id, SESSION_TTL_HOURS)
        .await?;

    tracing::info!(user_id = %user.id, "registered");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token, &state.config.env)),
        Json(json!({
            "message": "User created successfully",
            "user": Identity { id: user.id, name: user.name, email: user.email, role: user.role },
        })),
    ))
}

#[utoipa::path(
    delete,
    path = "/auth/logout",
    responses((status = 200, description = "Session deleted, cookie cleared")),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.auth.delete_session(cookie.value()).await?;
    }

    Ok((
        jar.add(clear_session_cookie()),
        Json(json!({ "message": "Logout successful" })),
    ))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Authenticated identity", body = Identity),
        (status = 401, description = "No live session")
    ),
    tag = "auth"
)]
pub async fn me(AuthUser(identity): AuthUser) -> Json<Identity> {
    Json(identity)
}

#[utoipa::path(
    put,
    path = "/auth/edit-avatar/{id}",
    responses(
        (status = 200, description = "Avatar replaced"),
        (status = 400, description = "No avatar file in the form"),
        (status = 403, description = "Not the account owner")
    ),
    tag = "auth"
)]
pub async fn edit_avatar(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if identity.id != id {
        return Err(ApiError::forbidden());
    }

    let form = MultipartForm::read(multipart).await?;
    let file = form
        .file_named("avatar")
        .ok_or_else(|| ApiError::BadRequest("Invalid field requirement".to_string()))?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let manager = MediaManager::new(state.storage.as_ref());
    if let Some(old_url) = &user.image_profile {
        manager.detach_batch(BUCKET_AVATARS, &[old_url.clone()]).await;
    }

    let stored = manager
        .attach_one(BUCKET_AVATARS, file)
        .await
        .map_err(ApiError::Storage)?;

    state.repo.set_user_avatar(id, &stored.media_url).await?;

    Ok(Json(json!({
        "message": "Avatar updated successfully",
        "imageProfile": stored.media_url,
    })))
}

#[utoipa::path(
    put,
    path = "/auth/edit-id-card-photo/{id}",
    responses(
        (status = 200, description = "ID card photo replaced"),
        (status = 400, description = "No photo file in the form"),
        (status = 403, description = "Not the account owner")
    ),
    tag = "auth"
)]
pub async fn edit_id_card_photo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if identity.id != id {
        return Err(ApiError::forbidden());
    }

    let form = MultipartForm::read(multipart).await?;
    let file = form
        .file_named("idCardPhoto")
        .ok_or_else(|| ApiError::BadRequest("Invalid field requirement".to_string()))?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // The credential photo is stored by key, not public URL; the bucket is
    // not publicly readable.
    if let Some(old_key) = &user.id_card_photo {
        if let Err(e) = state
            .storage
            .delete_objects(BUCKET_CREDENTIALS, &[old_key.clone()])
            .await
        {
            tracing::error!(error = %e, "stale credential photo left behind");
        }
    }

    let key = storage_key(&file.file_name);
    state
        .storage
        .upload(BUCKET_CREDENTIALS, &key, file.bytes.clone(), &file.content_type)
        .await
        .map_err(ApiError::Storage)?;

    state.repo.set_user_id_card(id, &key).await?;

    Ok(Json(json!({ "message": "ID card photo updated successfully" })))
}
