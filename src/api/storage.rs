use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::storage::{
    PresignDownloadRequest, PresignDownloadResponse, PresignUploadRequest,
    PresignUploadResponse, UploadResponse,
};
use crate::services::access_policy::RequestContext;
use crate::services::storage::{StorageBucket, StorageService, MAX_OBJECT_BYTES};

/// Multipart framing on top of the largest accepted object.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/presign-upload", post(presign_upload))
        .route("/presign-download", post(presign_download))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_OBJECT_BYTES + MULTIPART_OVERHEAD)),
        )
}

fn require_storage(state: &AppState) -> Result<&StorageService, ApiError> {
    state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage is not configured".to_string()))
}

fn check_object(bucket: StorageBucket, content_type: &str, size: u64) -> Result<(), ApiError> {
    if size > bucket.max_bytes() as u64 {
        return Err(ApiError::BadRequest(format!(
            "File size exceeds {}MB limit for {}",
            bucket.max_bytes() / (1024 * 1024),
            bucket.prefix()
        )));
    }
    if !bucket.accepts(content_type) {
        return Err(ApiError::BadRequest(format!(
            "Content type {content_type} is not allowed in {}",
            bucket.prefix()
        )));
    }
    Ok(())
}

async fn presign_upload(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignUploadRequest>,
) -> Result<Json<PresignUploadResponse>, ApiError> {
    let ctx = current.context();
    let storage = require_storage(&state)?;
    check_object(payload.bucket, &payload.content_type, payload.size_bytes)?;

    let key = payload.bucket.new_key(&ctx, &payload.filename);
    if !payload.bucket.can_write(&ctx, &key) {
        return Err(ApiError::Forbidden("You cannot upload to this bucket"));
    }

    let upload_url = storage
        .presign_put(&key, &payload.content_type)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate upload URL"))?;

    Ok(Json(PresignUploadResponse {
        key,
        upload_url,
        expires_in: storage.presign_ttl().as_secs(),
    }))
}

/// Bucket policy, plus tutor attachments for the student the feedback is addressed to.
async fn may_read(
    state: &AppState,
    ctx: &RequestContext,
    bucket: StorageBucket,
    key: &str,
) -> Result<bool, ApiError> {
    if bucket.can_read(ctx, key) {
        return Ok(true);
    }
    if bucket != StorageBucket::FeedbackFiles {
        return Ok(false);
    }
    repositories::feedback::is_recipient(state.db(), &ctx.user_id, key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check feedback attachment"))
}

async fn presign_download(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignDownloadRequest>,
) -> Result<Json<PresignDownloadResponse>, ApiError> {
    let storage = require_storage(&state)?;
    if !may_read(&state, &current.context(), payload.bucket, &payload.key).await? {
        return Err(ApiError::Forbidden("You cannot read this object"));
    }

    let download_url = storage
        .presign_get(&payload.key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate download URL"))?;

    Ok(Json(PresignDownloadResponse {
        key: payload.key,
        download_url,
        expires_in: storage.presign_ttl().as_secs(),
    }))
}

async fn upload(
    current: CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let ctx = current.context();
    let storage = require_storage(&state)?;

    let mut bucket: Option<StorageBucket> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "bucket" {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest("Invalid bucket".to_string()))?;
            bucket = Some(
                StorageBucket::parse(&text)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown bucket {text}")))?,
            );
        } else if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            let limit = bucket.map_or(MAX_OBJECT_BYTES, StorageBucket::max_bytes);
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() + chunk.len() > limit {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {}MB limit",
                        limit / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file_bytes = Some(bytes);
        }
    }

    let bucket = bucket.ok_or_else(|| ApiError::BadRequest("bucket is required".to_string()))?;
    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let filename = filename.unwrap_or_else(|| "file".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    check_object(bucket, &content_type, file_bytes.len() as u64)?;

    let key = bucket.new_key(&ctx, &filename);
    if !bucket.can_write(&ctx, &key) {
        return Err(ApiError::Forbidden("You cannot upload to this bucket"));
    }

    let (size, sha256) = storage
        .upload_bytes(&key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload file to S3"))?;

    tracing::info!(key = %key, size, user_id = %ctx.user_id, "Object uploaded");

    Ok(Json(UploadResponse { key, size, sha256 }))
}

#[cfg(test)]
mod tests;
