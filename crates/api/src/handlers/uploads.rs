//! Producer endpoints: upload slots and upload verification.
//!
//! The client uploads the document straight to object storage through a
//! presigned URL, then reports the result. A successful report completes the
//! file row and publishes a job for the worker pool.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cuedeck_core::error::CoreError;
use cuedeck_core::formats::normalize_format;
use cuedeck_core::message::FileJobMessage;
use cuedeck_core::types::DbId;
use cuedeck_db::models::file::CompleteFileDetails;
use cuedeck_db::repositories::FileRepo;
use serde::{Deserialize, Serialize};

use super::ensure_collection_owned;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Reported status of a successful client upload.
const STATUS_SUCCESS: &str = "success";

/// Response for `POST /collections/{id}/uploads`.
#[derive(Debug, Serialize)]
pub struct UploadSlot {
    pub file_id: DbId,
    pub object_key: String,
    /// Presigned PUT URL for the document body.
    pub url: String,
}

/// Client report for an attempted upload.
#[derive(Debug, Deserialize)]
pub struct VerifyUpload {
    pub status: String,
    pub object_key: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Client-side failure reason, logged only.
    #[serde(default)]
    pub error: Option<String>,
}

/// What verification did with the file.
#[derive(Debug, Serialize)]
pub struct VerifyResult {
    pub file_id: DbId,
    /// `queued`, `already_processed` or `discarded`.
    pub status: &'static str,
}

/// POST /api/v1/collections/{id}/uploads
pub async fn create_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_collection_owned(&state, collection_id, auth.user_id).await?;

    let file = FileRepo::create_pending(&state.pool, collection_id, auth.user_id).await?;

    let url = match state
        .storage
        .presign_put(&file.object_key, state.config.presign_expiry)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            // The slot is unusable without a URL.
            if let Err(cleanup) =
                FileRepo::delete_unprocessed(&state.pool, file.id, auth.user_id).await
            {
                tracing::warn!(file_id = %file.id, error = %cleanup, "Failed to remove pending file");
            }
            return Err(e.into());
        }
    };

    tracing::info!(file_id = %file.id, %collection_id, "Upload slot issued");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadSlot {
                file_id: file.id,
                object_key: file.object_key,
                url,
            },
        }),
    ))
}

/// POST /api/v1/collections/{id}/uploads/verify
pub async fn verify_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
    Json(input): Json<VerifyUpload>,
) -> AppResult<impl IntoResponse> {
    let file_id: DbId = input.object_key.parse().map_err(|_| {
        AppError::BadRequest(format!("object_key '{}' is not a file id", input.object_key))
    })?;

    let succeeded = input.status == STATUS_SUCCESS;
    let details = if succeeded {
        Some(validate_details(&input)?)
    } else {
        None
    };

    ensure_collection_owned(&state, collection_id, auth.user_id).await?;

    let Some(details) = details else {
        let removed = FileRepo::delete_unprocessed(&state.pool, file_id, auth.user_id).await?;
        tracing::info!(
            %file_id,
            status = %input.status,
            reason = input.error.as_deref().unwrap_or(""),
            removed,
            "Upload reported as failed",
        );
        return Ok(verified(file_id, "discarded"));
    };

    let updated = FileRepo::complete_details(
        &state.pool,
        file_id,
        collection_id,
        auth.user_id,
        &details,
    )
    .await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "File",
            id: file_id,
        }));
    }

    if FileRepo::processed(&state.pool, file_id).await? == Some(true) {
        tracing::info!(%file_id, "File already processed, not enqueueing");
        return Ok(verified(file_id, "already_processed"));
    }

    let job = FileJobMessage {
        user_id: auth.user_id,
        collection_id,
        file_name: details.file_name,
        file_key: file_id.to_string(),
        format: details.format,
    };
    state.publisher.publish(&job).await?;

    tracing::info!(%file_id, %collection_id, format = %job.format, "File job queued");
    Ok(verified(file_id, "queued"))
}

fn validate_details(input: &VerifyUpload) -> Result<CompleteFileDetails, AppError> {
    let file_name = input
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("file_name is required".into()))?;

    let format = input
        .format
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("format is required".into()))
        .and_then(|raw| normalize_format(raw).map_err(AppError::from))?;

    Ok(CompleteFileDetails {
        file_name: file_name.to_string(),
        format,
    })
}

fn verified(file_id: DbId, status: &'static str) -> (StatusCode, Json<DataResponse<VerifyResult>>) {
    (
        StatusCode::OK,
        Json(DataResponse {
            data: VerifyResult { file_id, status },
        }),
    )
}
