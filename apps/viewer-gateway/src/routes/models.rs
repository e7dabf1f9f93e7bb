use aps_client::{flatten, ModelUrn, ObjectEntry, StatusSummary};
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{metrics, state::AppState};

use super::{map_aps_err, map_delete_err, ApiError, ApiResult};

pub const FILE_FIELD: &str = "model-file";
pub const ENTRYPOINT_FIELD: &str = "model-zip-entrypoint";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub urn: String,
}

impl From<&ObjectEntry> for ModelSummary {
    fn from(entry: &ObjectEntry) -> Self {
        Self {
            name: entry.object_key.clone(),
            urn: entry.urn().to_string(),
        }
    }
}

pub async fn list_models(State(state): State<AppState>) -> ApiResult<Vec<ModelSummary>> {
    let objects = state
        .models
        .list_objects()
        .await
        .map_err(map_aps_err("list_objects"))?;
    Ok(Json(objects.iter().map(ModelSummary::from).collect()))
}

pub async fn model_status(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> ApiResult<StatusSummary> {
    let urn = ModelUrn::parse(&urn).map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let manifest = state
        .models
        .manifest(&urn)
        .await
        .map_err(map_aps_err("manifest"))?;
    Ok(Json(flatten(manifest.as_ref())))
}

/// Stores the uploaded file and starts its translation without waiting for
/// it; callers poll the status route.
pub async fn upload_model(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ModelSummary> {
    let form = UploadForm::read(multipart).await?;
    let Some(file) = form.file else {
        return Err(ApiError::BadRequest(format!(
            "The required field (\"{FILE_FIELD}\") is missing."
        )));
    };

    let entry = state
        .models
        .upload_object(&file.name, file.temp.path())
        .await
        .map_err(map_aps_err("upload_object"))?;
    metrics::UPLOADS.inc();

    let urn = entry.urn();
    state
        .models
        .translate_object(&urn, form.entrypoint.as_deref())
        .await
        .map_err(map_aps_err("translate_object"))?;
    metrics::TRANSLATIONS_SUBMITTED.inc();
    info!(
        object_key = %entry.object_key,
        size = file.size,
        %urn,
        entrypoint = ?form.entrypoint,
        "model uploaded and translation requested"
    );

    Ok(Json(ModelSummary {
        name: entry.object_key,
        urn: urn.to_string(),
    }))
}

/// Deletes by storage key, which is the model name rather than its urn.
pub async fn delete_model(
    State(state): State<AppState>,
    Path(object_key): Path<String>,
) -> Result<String, ApiError> {
    state
        .models
        .delete_object(&object_key)
        .await
        .map_err(map_delete_err(&object_key))?;
    Ok(format!(
        "The {object_key} file is deleted from {} successfully.",
        state.bucket()
    ))
}

struct UploadedFile {
    name: String,
    // removed from disk when dropped
    temp: NamedTempFile,
    size: u64,
}

struct UploadForm {
    file: Option<UploadedFile>,
    entrypoint: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm {
            file: None,
            entrypoint: None,
        };
        while let Some(mut field) = multipart.next_field().await.map_err(multipart_err)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some(FILE_FIELD) => {
                    let Some(file_name) = field
                        .file_name()
                        .map(str::to_string)
                        .filter(|n| !n.is_empty())
                    else {
                        continue;
                    };
                    form.file = Some(spool(&mut field, file_name).await?);
                }
                Some(ENTRYPOINT_FIELD) => {
                    let value = field.text().await.map_err(multipart_err)?;
                    form.entrypoint = normalize_entrypoint(value);
                }
                other => debug!(field = ?other, "ignoring unknown upload field"),
            }
        }
        Ok(form)
    }
}

/// An empty entry point means the upload is not an archive.
fn normalize_entrypoint(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

async fn spool(field: &mut Field<'_>, name: String) -> Result<UploadedFile, ApiError> {
    let temp = NamedTempFile::new().map_err(io_err)?;
    let mut file = tokio::fs::File::from_std(temp.reopen().map_err(io_err)?);
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_err)? {
        size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;
    Ok(UploadedFile { name, temp, size })
}

fn multipart_err(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn io_err(err: std::io::Error) -> ApiError {
    tracing::error!(error = %err, "failed to spool upload to disk");
    ApiError::Internal("failed to store upload".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_entrypoint_is_absent() {
        assert_eq!(normalize_entrypoint(String::new()), None);
        assert_eq!(normalize_entrypoint("  ".into()), None);
        assert_eq!(
            normalize_entrypoint("scene.svf".into()),
            Some("scene.svf".to_string())
        );
    }
}
