use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Response, StatusCode};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    auth::TokenCache, AccessToken, ApsError, Manifest, ModelService, ModelUrn, ObjectEntry, Scope,
    TranslationJob,
};

pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";
/// Upload part size; S3 requires every part but the last to be at least 5 MiB.
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;
/// APS hands out at most this many signed part URLs per request.
pub const DEFAULT_MAX_URLS_PER_REQUEST: u64 = 25;

/// Characters left untouched when an object key becomes a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct ApsClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub bucket: String,
    pub base_url: String,
    pub timeout: Duration,
    pub part_size: u64,
    pub max_urls_per_request: u64,
}

impl ApsClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            bucket: bucket.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            part_size: DEFAULT_PART_SIZE,
            max_urls_per_request: DEFAULT_MAX_URLS_PER_REQUEST,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides how uploads are split. Both values are clamped to at least 1.
    pub fn with_upload_chunking(mut self, part_size: u64, max_urls_per_request: u64) -> Self {
        self.part_size = part_size.max(1);
        self.max_urls_per_request = max_urls_per_request.max(1);
        self
    }
}

/// HTTP implementation of [`ModelService`] backed by APS.
#[derive(Clone)]
pub struct ApsClient {
    pub(crate) http: Client,
    pub(crate) config: Arc<ApsClientConfig>,
    tokens: Arc<TokenCache>,
    pub(crate) bucket_ready: Arc<OnceCell<()>>,
}

impl ApsClient {
    pub fn new(config: ApsClientConfig) -> Result<Self, ApsError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens: Arc::new(TokenCache::default()),
            bucket_ready: Arc::new(OnceCell::new()),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub(crate) fn bucket_path(&self) -> String {
        format!("/oss/v2/buckets/{}", encode_segment(&self.config.bucket))
    }

    pub(crate) fn object_path(&self, object_key: &str) -> String {
        format!("{}/objects/{}", self.bucket_path(), encode_segment(object_key))
    }

    /// Returns a token for `scope`, issuing a new one when the cached token
    /// is missing or about to expire.
    pub async fn token(&self, scope: Scope) -> Result<AccessToken, ApsError> {
        if let Some(token) = self.tokens.get(scope).await {
            return Ok(token);
        }

        debug!(scope = scope.as_str(), "requesting aps access token");
        let res = self
            .http
            .post(self.url("/authentication/v2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;
        let token: AccessToken = check(res).await?.json().await?;
        self.tokens.store(scope, &token).await;
        Ok(token)
    }

    pub(crate) async fn bearer(&self) -> Result<String, ApsError> {
        Ok(self.token(Scope::Internal).await?.access_token)
    }
}

pub(crate) fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Passes successful responses through; 404 becomes [`ApsError::NotFound`].
pub(crate) async fn check(res: Response) -> Result<Response, ApsError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApsError::NotFound);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ApsError::UnexpectedStatus { status, body })
}

#[async_trait]
impl ModelService for ApsClient {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn viewer_token(&self) -> Result<AccessToken, ApsError> {
        self.token(Scope::Viewer).await
    }

    async fn list_objects(&self) -> Result<Vec<ObjectEntry>, ApsError> {
        self.ensure_bucket().await?;
        self.list_bucket_objects().await
    }

    async fn upload_object(
        &self,
        object_key: &str,
        source: &Path,
    ) -> Result<ObjectEntry, ApsError> {
        self.ensure_bucket().await?;
        self.upload_file(object_key, source).await
    }

    async fn translate_object(
        &self,
        urn: &ModelUrn,
        root_filename: Option<&str>,
    ) -> Result<TranslationJob, ApsError> {
        self.submit_job(urn, root_filename).await
    }

    async fn manifest(&self, urn: &ModelUrn) -> Result<Option<Manifest>, ApsError> {
        match self.fetch_manifest(urn).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(ApsError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn delete_object(&self, object_key: &str) -> Result<(), ApsError> {
        self.remove_object(object_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_escaped_as_single_segments() {
        let client = ApsClient::new(
            ApsClientConfig::new("id", "secret", "demo-bucket").with_base_url("http://aps.test/"),
        )
        .unwrap();
        assert_eq!(
            client.url(&client.object_path("floor plan/v2.rvt")),
            "http://aps.test/oss/v2/buckets/demo-bucket/objects/floor%20plan%2Fv2.rvt"
        );
    }

    #[test]
    fn upload_chunking_defaults_and_clamps() {
        let config = ApsClientConfig::new("id", "secret", "demo-bucket");
        assert_eq!(config.part_size, DEFAULT_PART_SIZE);
        assert_eq!(config.max_urls_per_request, DEFAULT_MAX_URLS_PER_REQUEST);

        let config = config.with_upload_chunking(0, 0);
        assert_eq!((config.part_size, config.max_urls_per_request), (1, 1));
    }
}
