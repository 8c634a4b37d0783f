use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    media::MediaManager,
    models::{
        ActivityProgram, ActivityStatus, ActivityTextRequest, ActivityWithMedia, MediaActivity,
        MediaDeleteResult,
    },
    storage::BUCKET_ACTIVITY_MEDIA,
};

use super::MultipartForm;

/// Loads an activity and enforces ownership. Absence (404) is reported before
/// ownership (403) so a member cannot probe which ids exist.
async fn owned_activity(
    state: &AppState,
    activity_id: Uuid,
    owner: Uuid,
) -> Result<ActivityProgram, ApiError> {
    let activity = state
        .repo
        .get_activity(activity_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;
    if activity.user_id != owner {
        return Err(ApiError::forbidden());
    }
    Ok(activity)
}

fn require_canceled(activity: &ActivityProgram, message: &str) -> Result<(), ApiError> {
    if activity.status != ActivityStatus::Canceled {
        return Err(ApiError::BadRequest(message.to_string()));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/member/activity-program",
    responses((status = 200, description = "Caller's programs with media", body = [ActivityWithMedia])),
    tag = "member"
)]
pub async fn list_activities(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let activities = state.repo.list_activities_for_owner(identity.id).await?;

    let mut data = Vec::with_capacity(activities.len());
    for activity in activities {
        let media = state.repo.list_activity_media(activity.id).await?;
        data.push(ActivityWithMedia { activity, media });
    }

    Ok(Json(json!({ "data": data })))
}

#[utoipa::path(
    get,
    path = "/member/activity-program/{activityId}",
    responses(
        (status = 200, description = "Program with media", body = ActivityWithMedia),
        (status = 403, description = "Owned by another member"),
        (status = 404, description = "Unknown program")
    ),
    tag = "member"
)]
pub async fn get_activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(activity_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = owned_activity(&state, activity_id, identity.id).await?;
    let media = state.repo.list_activity_media(activity.id).await?;
    Ok(Json(json!({ "data": ActivityWithMedia { activity, media } })))
}

#[utoipa::path(
    post,
    path = "/member/activity-program",
    request_body = ActivityTextRequest,
    responses(
        (status = 200, description = "Program created"),
        (status = 400, description = "Missing title or description")
    ),
    tag = "member"
)]
pub async fn create_activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<ActivityTextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid field requirement".to_string()));
    }

    let activity_id = state
        .repo
        .create_activity(identity.id, req.title.trim(), &req.description, Utc::now())
        .await?;

    tracing::info!(%activity_id, user_id = %identity.id, "activity created");

    Ok(Json(json!({
        "message": "Activity program created",
        "activityId": activity_id,
    })))
}

#[utoipa::path(
    post,
    path = "/member/activity-media/{activityId}",
    responses(
        (status = 200, description = "Files attached"),
        (status = 400, description = "No files in the form"),
        (status = 403, description = "Owned by another member"),
        (status = 500, description = "Every upload failed")
    ),
    tag = "member"
)]
pub async fn upload_activity_media(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(activity_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let activity = state
        .repo
        .get_activity(activity_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;
    if activity.user_id != identity.id {
        return Err(ApiError::Forbidden(
            "You do not have permission to upload media to this activity".to_string(),
        ));
    }

    let form = MultipartForm::read(multipart).await?;
    let files: Vec<_> = form.files_named("files").into_iter().cloned().collect();
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let manager = MediaManager::new(state.storage.as_ref());
    let stored = manager.attach_batch(BUCKET_ACTIVITY_MEDIA, &files).await;
    if stored.is_empty() {
        return Err(ApiError::Storage(
            "Failed to upload any media files.".to_string(),
        ));
    }

    let count = stored.len();
    for blob in stored {
        state
            .repo
            .insert_activity_media(MediaActivity {
                id: Uuid::new_v4(),
                media_url: blob.media_url,
                content_type: blob.content_type,
                format: blob.format,
                size: blob.size,
                order: blob.order,
                activity_program_id: activity_id,
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
    path = "/member/activity-program/{activityId}",
    request_body = ActivityTextRequest,
    responses(
        (status = 200, description = "Title and description updated"),
        (status = 400, description = "Program is not canceled"),
        (status = 403, description = "Owned by another member")
    ),
    tag = "member"
)]
pub async fn update_activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(activity_id): Path<Uuid>,
    Json(req): Json<ActivityTextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = owned_activity(&state, activity_id, identity.id).await?;
    require_canceled(&activity, "Activity is not in Canceled status")?;

    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid field requirement".to_string()));
    }

    state
        .repo
        .update_activity_text(activity_id, req.title.trim(), &req.description)
        .await?;

    Ok(Json(json!({ "message": "Activity updated successfully" })))
}

#[utoipa::path(
    put,
    path = "/member/activity-media/{activityId}",
    responses(
        (status = 200, description = "Media batch updated, counts reported"),
        (status = 400, description = "Program is not canceled"),
        (status = 403, description = "Owned by another member")
    ),
    tag = "member"
)]
pub async fn update_activity_media(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(activity_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let activity = owned_activity(&state, activity_id, identity.id).await?;
    require_canceled(&activity, "Activity is not in Canceled status")?;

    let form = MultipartForm::read(multipart).await?;
    let ids_to_delete = form.id_values("mediaIdsToDelete")?;

    let manager = MediaManager::new(state.storage.as_ref());

    // Only ids actually belonging to this activity are honored; foreign ids
    // silently drop out of the resolved set.
    let mut deleted_count = 0u64;
    if !ids_to_delete.is_empty() {
        let doomed = state
            .repo
            .find_activity_media_by_ids(&ids_to_delete, activity_id)
            .await?;
        let urls: Vec<String> = doomed.iter().map(|m| m.media_url.clone()).collect();
        manager.detach_batch(BUCKET_ACTIVITY_MEDIA, &urls).await;
        let owned_ids: Vec<Uuid> = doomed.iter().map(|m| m.id).collect();
        deleted_count = state.repo.delete_activity_media_by_ids(&owned_ids).await?;
    }

    let files: Vec<_> = form.files_named("files").into_iter().cloned().collect();
    let stored = manager.attach_batch(BUCKET_ACTIVITY_MEDIA, &files).await;
    let added_count = stored.len();
    for blob in stored {
        state
            .repo
            .insert_activity_media(MediaActivity {
                id: Uuid::new_v4(),
                media_url: blob.media_url,
                content_type: blob.content_type,
                format: blob.format,
                size: blob.size,
                order: blob.order,
                activity_program_id: activity_id,
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
    path = "/member/activity-program/{activityId}",
    responses(
        (status = 200, description = "Program and media deleted, per-media results reported"),
        (status = 400, description = "Program is not canceled"),
        (status = 403, description = "Owned by another member")
    ),
    tag = "member"
)]
pub async fn delete_activity(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(activity_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let activity = owned_activity(&state, activity_id, identity.id).await?;
    require_canceled(&activity, "Only canceled activities can be deleted")?;

    let media = state.repo.list_activity_media(activity_id).await?;

    // Blobs and child rows go first, the parent row last.
    let manager = MediaManager::new(state.storage.as_ref());
    let urls: Vec<String> = media.iter().map(|m| m.media_url.clone()).collect();
    manager.detach_batch(BUCKET_ACTIVITY_MEDIA, &urls).await;

    let mut media_results = Vec::with_capacity(media.len());
    for item in &media {
        let success = state.repo.delete_activity_media(item.id).await?;
        media_results.push(MediaDeleteResult {
            media_id: item.id,
            success,
        });
    }

    state.repo.delete_activity(activity_id).await?;

    tracing::info!(%activity_id, user_id = %identity.id, "activity deleted");

    Ok(Json(json!({
        "message": "Activity and all media deleted",
        "mediaResults": media_results,
    })))
}
