use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AccessToken, ApsError, Manifest, ModelUrn};

/// OSS object as listed or returned after an upload completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    #[serde(default)]
    pub bucket_key: String,
    pub object_key: String,
    pub object_id: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ObjectEntry {
    pub fn urn(&self) -> ModelUrn {
        ModelUrn::encode(&self.object_id)
    }
}

/// Acknowledgement of a submitted translation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub result: String,
    pub urn: String,
}

/// Everything the gateway needs from APS.
///
/// Implementations are shared across requests and must be cheap to call
/// concurrently.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Bucket every object operation is scoped to.
    fn bucket(&self) -> &str;

    /// Short-lived public token suitable for the browser viewer.
    async fn viewer_token(&self) -> Result<AccessToken, ApsError>;

    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, ApsError>;

    /// Stores the file at `source` under `object_key`.
    async fn upload_object(&self, object_key: &str, source: &Path)
        -> Result<ObjectEntry, ApsError>;

    /// Requests translation; `root_filename` marks the object as an archive
    /// whose entry point is that file.
    async fn translate_object(
        &self,
        urn: &ModelUrn,
        root_filename: Option<&str>,
    ) -> Result<TranslationJob, ApsError>;

    /// `Ok(None)` when no manifest exists for the model yet.
    async fn manifest(&self, urn: &ModelUrn) -> Result<Option<Manifest>, ApsError>;

    /// Fails with [`ApsError::NotFound`] when the key does not exist.
    async fn delete_object(&self, object_key: &str) -> Result<(), ApsError>;
}
