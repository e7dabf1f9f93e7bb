use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    AccessToken, ApsError, Manifest, ModelService, ModelUrn, ObjectEntry, TranslationJob,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewerToken,
    ListObjects,
    UploadObject,
    TranslateObject,
    Manifest,
    DeleteObject,
}

/// A call observed by [`InMemoryModelService`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ViewerToken,
    ListObjects,
    UploadObject { object_key: String, size: u64 },
    TranslateObject { urn: ModelUrn, root_filename: Option<String> },
    Manifest { urn: ModelUrn },
    DeleteObject { object_key: String },
}

#[derive(Default)]
struct Inner {
    objects: Vec<ObjectEntry>,
    manifests: HashMap<ModelUrn, Manifest>,
    failures: Vec<Operation>,
    calls: Vec<RecordedCall>,
}

/// In-memory adapter for tests and local wiring.
pub struct InMemoryModelService {
    bucket: String,
    inner: Mutex<Inner>,
}

impl InMemoryModelService {
    pub fn new(bucket: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            bucket: bucket.into(),
            inner: Mutex::new(Inner::default()),
        })
    }

    pub async fn insert_object(&self, object_key: &str, object_id: &str) {
        self.inner.lock().await.objects.push(ObjectEntry {
            bucket_key: self.bucket.clone(),
            object_key: object_key.to_string(),
            object_id: object_id.to_string(),
            size: None,
            sha1: None,
            location: None,
        });
    }

    pub async fn insert_manifest(&self, urn: ModelUrn, manifest: Manifest) {
        self.inner.lock().await.manifests.insert(urn, manifest);
    }

    /// Makes every subsequent `op` fail as if APS answered 500.
    pub async fn fail(&self, op: Operation) {
        self.inner.lock().await.failures.push(op);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn objects(&self) -> Vec<ObjectEntry> {
        self.inner.lock().await.objects.clone()
    }

    fn object_id(&self, object_key: &str) -> String {
        format!("urn:adsk.objects:os.object:{}/{}", self.bucket, object_key)
    }
}

impl Inner {
    fn record(&mut self, op: Operation, call: RecordedCall) -> Result<(), ApsError> {
        self.calls.push(call);
        if self.failures.contains(&op) {
            return Err(ApsError::UnexpectedStatus {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("injected {op:?} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ModelService for InMemoryModelService {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn viewer_token(&self) -> Result<AccessToken, ApsError> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::ViewerToken, RecordedCall::ViewerToken)?;
        Ok(AccessToken {
            access_token: "in-memory-viewer-token".into(),
            token_type: "Bearer".into(),
            expires_in: 3599,
        })
    }

    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, ApsError> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::ListObjects, RecordedCall::ListObjects)?;
        Ok(inner.objects.clone())
    }

    async fn upload_object(
        &self,
        object_key: &str,
        source: &Path,
    ) -> Result<ObjectEntry, ApsError> {
        let size = tokio::fs::metadata(source).await?.len();
        let mut inner = self.inner.lock().await;
        inner.record(
            Operation::UploadObject,
            RecordedCall::UploadObject {
                object_key: object_key.to_string(),
                size,
            },
        )?;
        let entry = ObjectEntry {
            bucket_key: self.bucket.clone(),
            object_key: object_key.to_string(),
            object_id: self.object_id(object_key),
            size: Some(size),
            sha1: None,
            location: None,
        };
        inner.objects.retain(|o| o.object_key != object_key);
        inner.objects.push(entry.clone());
        Ok(entry)
    }

    async fn translate_object(
        &self,
        urn: &ModelUrn,
        root_filename: Option<&str>,
    ) -> Result<TranslationJob, ApsError> {
        let mut inner = self.inner.lock().await;
        inner.record(
            Operation::TranslateObject,
            RecordedCall::TranslateObject {
                urn: urn.clone(),
                root_filename: root_filename.map(str::to_string),
            },
        )?;
        Ok(TranslationJob {
            result: "created".into(),
            urn: urn.to_string(),
        })
    }

    async fn manifest(&self, urn: &ModelUrn) -> Result<Option<Manifest>, ApsError> {
        let mut inner = self.inner.lock().await;
        inner.record(Operation::Manifest, RecordedCall::Manifest { urn: urn.clone() })?;
        Ok(inner.manifests.get(urn).cloned())
    }

    async fn delete_object(&self, object_key: &str) -> Result<(), ApsError> {
        let mut inner = self.inner.lock().await;
        inner.record(
            Operation::DeleteObject,
            RecordedCall::DeleteObject {
                object_key: object_key.to_string(),
            },
        )?;
        let before = inner.objects.len();
        inner.objects.retain(|o| o.object_key != object_key);
        if inner.objects.len() == before {
            return Err(ApsError::NotFound);
        }
        Ok(())
    }
}
