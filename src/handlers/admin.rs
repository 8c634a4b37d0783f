use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    media::MediaManager,
    models::{
        ActivityStatus, MediaDeleteResult, MediaNews, MemberStatus, News, NewsRequest,
        NewsWithMedia, OrganizationPosition, OrganizationStructure, Pagination, RegisterRequest,
        StatusPatch,
    },
    storage::{
        BUCKET_ACTIVITY_MEDIA, BUCKET_AVATARS, BUCKET_CREDENTIALS, BUCKET_NEWS_MEDIA,
        BUCKET_ORGANIZATION_IMAGES,
    },
};

use super::{MultipartForm, PageQuery, auth::build_user, auth::validate_registration};

/// Parses a `{"status": ...}` patch body against a concrete status enum.
/// Anything outside the closed set is a validation failure, not a 500.
fn parse_status<T: serde::de::DeserializeOwned>(patch: &StatusPatch) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::String(patch.status.clone()))
        .map_err(|_| ApiError::BadRequest("Invalid field requirement".to_string()))
}

// --- Members ---

#[utoipa::path(
    get,
    path = "/admin/members",
    params(("page" = Option<i64>, Query), ("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Paginated MEMBER-role users, newest first")),
    tag = "admin"
)]
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = query.resolve();

    let members = state.repo.list_members(limit, offset).await?;
    let total = state.repo.count_members().await?;

    Ok(Json(json!({
        "data": members,
        "pagination": Pagination::new(total, page, limit),
    })))
}

#[utoipa::path(
    patch,
    path = "/admin/members/{userId}",
    request_body = StatusPatch,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Status outside the member set"),
        (status = 404, description = "Unknown user")
    ),
    tag = "admin"
)]
pub async fn patch_member_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(patch): Json<StatusPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let status: MemberStatus = parse_status(&patch)?;

    if !state.repo.set_member_status(user_id, status).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({ "message": "Status updated" })))
}

#[utoipa::path(
    post,
    path = "/admin/members",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member account created"),
        (status = 400, description = "Field validation failed"),
        (status = 409, description = "Email already in use")
    ),
    tag = "admin"
)]
pub async fn create_member(
    State(state): State<AppState>,
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

    // Unlike self-registration, no session is minted for the new account.
    let user = state.repo.create_user(build_user(&req)?).await?;

    tracing::info!(user_id = %user.id, "member created by admin");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "userId": user.id })),
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/members/{userId}",
    responses(
        (status = 200, description = "User, sessions and all owned media removed"),
        (status = 404, description = "Unknown user")
    ),
    tag = "admin"
)]
pub async fn delete_member(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let manager = MediaManager::new(state.storage.as_ref());

    // Blob cleanup across every bucket the user touched; failures are logged
    // and never block the row delete.
    if let Some(key) = &user.id_card_photo {
        if let Err(e) = state
            .storage
            .delete_objects(BUCKET_CREDENTIALS, &[key.clone()])
            .await
        {
            tracing::error!(error = %e, "credential photo left behind");
        }
    }
    if let Some(url) = &user.image_profile {
        manager.detach_batch(BUCKET_AVATARS, &[url.clone()]).await;
    }

    let activity_urls = state.repo.list_activity_media_urls_for_user(user_id).await?;
    manager
        .detach_batch(BUCKET_ACTIVITY_MEDIA, &activity_urls)
        .await;

    let news_urls = state.repo.list_news_media_urls_for_user(user_id).await?;
    manager.detach_batch(BUCKET_NEWS_MEDIA, &news_urls).await;

    // Sessions, activities, news and their media rows cascade.
    state.repo.delete_user(user_id).await?;

    tracing::info!(%user_id, "user deleted");

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

// --- Organization structure ---

#[utoipa::path(
    post,
    path = "/admin/organization-structure",
    responses(
        (status = 201, description = "Structure slot created"),
        (status = 400, description = "Missing name, order, position or image")
    ),
    tag = "admin"
)]
pub async fn create_structure(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = MultipartForm::read(multipart).await?;

    let invalid = || ApiError::BadRequest("Invalid field requirement".to_string());
    let name = form.value("name").filter(|v| !v.trim().is_empty()).ok_or_else(invalid)?;
    let order: i32 = form
        .value("order")
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(invalid)?;
    let position: OrganizationPosition = form
        .value("position")
        .and_then(|v| serde_json::from_value(serde_json::Value::String(v.to_string())).ok())
        .ok_or_else(invalid)?;
    let image = form.file_named("image").ok_or_else(invalid)?;

    let manager = MediaManager::new(state.storage.as_ref());
    let stored = manager
        .attach_one(BUCKET_ORGANIZATION_IMAGES, image)
        .await
        .map_err(ApiError::Storage)?;

    state
        .repo
        .create_structure(OrganizationStructure {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            position,
            order,
            media_url: stored.media_url,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Structure organization added successfully" })),
    ))
}

#[utoipa::path(
    put,
    path = "/admin/organization-structure/{id}",
    responses(
        (status = 200, description = "Slot updated; image kept unless replaced"),
        (status = 400, description = "Missing name, order or position"),
        (status = 404, description = "Unknown slot")
    ),
    tag = "admin"
)]
pub async fn update_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .repo
        .get_structure(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Structure organization not found".to_string()))?;

    let form = MultipartForm::read(multipart).await?;

    let invalid = || ApiError::BadRequest("Invalid field requirement".to_string());
    let name = form.value("name").filter(|v| !v.trim().is_empty()).ok_or_else(invalid)?;
    let order: i32 = form
        .value("order")
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(invalid)?;
    let position: OrganizationPosition = form
        .value("position")
        .and_then(|v| serde_json::from_value(serde_json::Value::String(v.to_string())).ok())
        .ok_or_else(invalid)?;

    // Replacing the image deletes the old blob first; without a new file the
    // row keeps its current URL.
    let manager = MediaManager::new(state.storage.as_ref());
    let new_url = match form.file_named("image") {
        Some(image) => {
            manager
                .detach_batch(BUCKET_ORGANIZATION_IMAGES, &[existing.media_url.clone()])
                .await;
            let stored = manager
                .attach_one(BUCKET_ORGANIZATION_IMAGES, image)
                .await
                .map_err(ApiError::Storage)?;
            Some(stored.media_url)
        }
        None => None,
    };

    state
        .repo
        .update_structure(id, name.trim(), order, position, new_url.as_deref())
        .await?;

    Ok(Json(json!({ "message": "Structure organization updated successfully" })))
}

#[utoipa::path(
    delete,
    path = "/admin/organization-structure/{id}",
    responses(
        (status = 200, description = "Slot and image removed"),
        (status = 404, description = "Unknown slot")
    ),
    tag = "admin"
)]
pub async fn delete_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let media_url = state
        .repo
        .delete_structure(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Structure organization not found".to_string()))?;

    MediaManager::new(state.storage.as_ref())
        .detach_batch(BUCKET_ORGANIZATION_IMAGES, &[media_url])
        .await;

    Ok(Json(json!({ "message": "Structure organization deleted successfully" })))
}

// --- Activity oversight ---

#[utoipa::path(
    get,
    path = "/admin/activity-program",
    params(("page" = Option<i64>, Query), ("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Paginated programs with owner projection")),
    tag = "admin"
)]
pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = query.resolve();

    let activities = state.repo.list_activities_page(limit, offset).await?;
    let total = state.repo.count_activities().await?;

    Ok(Json(json!({
        "data": activities,
        "pagination": Pagination::new(total, page, limit),
    })))
}

#[utoipa::path(
    patch,
    path = "/admin/activity-program/{id}",
    request_body = StatusPatch,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Status outside the activity set"),
        (status = 404, description = "Unknown program")
    ),
    tag = "admin"
)]
pub async fn patch_activity_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<StatusPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let status: ActivityStatus = parse_status(&patch)?;

    if !state.repo.set_activity_status(id, status).await? {
        return Err(ApiError::NotFound("Activity not found".to_string()));
    }

    Ok(Json(json!({ "message": "Status updated" })))
}

// --- News ---

/// Loads a news post and enforces that the caller authored it.
async fn owned_news(state: &AppState, news_id: Uuid, owner: Uuid) -> Result<News, ApiError> {
    let news = state
        .repo
        .get_news(news_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("News not found".to_string()))?;
    if news.user_id != owner {
        return Err(ApiError::Forbidden(
            "You do not have permission to modify this news".to_string(),
        ));
    }
    Ok(news)
}

fn validate_news(req: &NewsRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty()
        || req.subtitle.trim().is_empty()
        || req.description.trim().is_empty()
    {
        return Err(ApiError::BadRequest("Invalid field requirement".to_string()));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/admin/news",
    params(("page" = Option<i64>, Query), ("limit" = Option<i64>, Query)),
    responses((status = 200, description = "Paginated news with media")),
    tag = "admin"
)]
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = query.resolve();

    let posts = state.repo.list_news_page(limit, offset).await?;
    let total = state.repo.count_news().await?;

    let mut data = Vec::with_capacity(posts.len());
    for news in posts {
        let media = state.repo.list_news_media(news.id).await?;
        data.push(NewsWithMedia { news, media });
    }

    Ok(Json(json!({
        "data": data,
        "pagination": Pagination::new(total, page, limit),
    })))
}

#[utoipa::path(
    get,
    path = "/admin/news/{newsId}",
    responses(
        (status = 200, description = "News with media and author projection"),
        (status = 404, description = "Unknown news")
    ),
    tag = "admin"
)]
pub async fn get_news(
    State(state): State<AppState>,
    Path(news_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let news = state
        .repo
        .get_news(news_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("News not found".to_string()))?;

    let author = state.repo.get_identity(news.user_id).await?;
    let media = state.repo.list_news_media(news.id).await?;

    Ok(Json(json!({
        "data": NewsWithMedia { news, media },
        "author": author,
    })))
}

#[utoipa::path(
    post,
    path = "/admin/news",
    request_body = NewsRequest,
    responses(
        (status = 201, description = "News created, caller is the owner"),
        (status = 400, description = "Field validation failed")
    ),
    tag = "admin"
)]
pub async fn create_news(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<NewsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_news(&req)?;

    let news_id = state.repo.create_news(identity.id, &req).await?;

    tracing::info!(%news_id, user_id = %identity.id, "news created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "News created successfully", "newsId": news_id })),
    ))
}

#[utoipa::path(
    post,
    path = "/admin/news-media/{newsId}",
    responses(
        (status = 200, description = "Files attached"),
        (status = 400, description = "No files in the form"),
        (status = 403, description = "Authored by another admin"),
        (status = 500, description = "Every upload failed")
    ),
    tag = "admin"
)]
pub async fn upload_news_media(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(news_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    owned_news(&state, news_id, identity.id).await?;

    let form = MultipartForm::read(multipart).await?;
    let files: Vec<_> = form.files_named("files").into_iter().cloned().collect();
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let manager = MediaManager::new(state.storage.as_ref());
    let stored = manager.attach_batch(BUCKET_NEWS_MEDIA, &files).await;
    if stored.is_empty() {
        return Err(ApiError::Storage(
            "Failed to upload any media files.".to_string(),
        ));
    }

    let count = stored.len();
    for blob in stored {
        state
            .repo
            .insert_news_media(MediaNews {
                id: Uuid::new_v4(),
                media_url: blob.media_url,
                content_type: blob.content_type,
                format: blob.format,
                size: blob.size,
                order: blob.order,
                news_id,
            })
            .await?;
    }

    Ok(Json(json!({
        "message": "Media uploaded successfully",
        "count": count,
    })))
}

#[utoipa::path(
    put,
    path = "/admin/news/{newsId}",
    request_body = NewsRequest,
    responses(
        (status = 200, description = "News updated"),
        (status = 403, description = "Authored by another admin"),
        (status = 404, description = "Unknown news")
    ),
    tag = "admin"
)]
pub async fn update_news(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(news_id): Path<Uuid>,
    Json(req): Json<NewsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    owned_news(&state, news_id, identity.id).await?;
    validate_news(&req)?;

    state.repo.update_news(news_id, &req).await?;

    Ok(Json(json!({ "message": "News updated successfully" })))
}

#[utoipa::path(
    put,
    path = "/admin/news-media/{newsId}",
    responses(
        (status = 200, description = "Media batch updated, counts reported"),
        (status = 403, description = "Authored by another admin"),
        (status = 404, description = "Unknown news")
    ),
    tag = "admin"
)]
pub async fn update_news_media(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(news_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    owned_news(&state, news_id, identity.id).await?;

    let form = MultipartForm::read(multipart).await?;
    let ids_to_delete = form.id_values("mediaIdsToDelete")?;

    let manager = MediaManager::new(state.storage.as_ref());

    let mut deleted_count = 0u64;
    if !ids_to_delete.is_empty() {
        let doomed = state
            .repo
            .find_news_media_by_ids(&ids_to_delete, news_id)
            .await?;
        let urls: Vec<String> = doomed.iter().map(|m| m.media_url.clone()).collect();
        manager.detach_batch(BUCKET_NEWS_MEDIA, &urls).await;
        let owned_ids: Vec<Uuid> = doomed.iter().map(|m| m.id).collect();
        deleted_count = state.repo.delete_news_media_by_ids(&owned_ids).await?;
    }

    let files: Vec<_> = form.files_named("files").into_iter().cloned().collect();
    let stored = manager.attach_batch(BUCKET_NEWS_MEDIA, &files).await;
    let added_count = stored.len();
    for blob in stored {
        state
            .repo
            .insert_news_media(MediaNews {
                id: Uuid::new_v4(),
                media_url: blob.media_url,
                content_type: blob.content_type,
                format: blob.format,
                size: blob.size,
                order: blob.order,
                news_id,
            })
            .await?;
    }

    Ok(Json(json!({
        "message": "Media updated successfully",
        "deletedMediaCount": deleted_count,
        "addedMediaCount": added_count,
    })))
}

#[utoipa::path(
    delete,
    path = "/admin/news/{newsId}",
    responses(
        (status = 200, description = "News and media deleted, per-media results reported"),
        (status = 403, description = "Authored by another admin"),
        (status = 404, description = "Unknown news")
    ),
    tag = "admin"
)]
pub async fn delete_news(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(news_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_news(&state, news_id, identity.id).await?;

    let media = state.repo.list_news_media(news_id).await?;

    let manager = MediaManager::new(state.storage.as_ref());
    let urls: Vec<String> = media.iter().map(|m| m.media_url.clone()).collect();
    manager.detach_batch(BUCKET_NEWS_MEDIA, &urls).await;

    let mut media_results = Vec::with_capacity(media.len());
    for item in &media {
        let success = state.repo.delete_news_media(item.id).await?;
        media_results.push(MediaDeleteResult {
            media_id: item.id,
            success,
        });
    }

    state.repo.delete_news(news_id).await?;

    tracing::info!(%news_id, user_id = %identity.id, "news deleted");

    Ok(Json(json!({
        "message": "News and all media deleted",
        "mediaResults": media_results,
    })))
}
