use std::time::Duration;

use anyhow::{bail, Context};
use aps_client::{ApsClientConfig, DEFAULT_BASE_URL};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub aps_client_id: Option<String>,
    #[serde(default)]
    pub aps_client_secret: Option<String>,
    #[serde(default)]
    pub aps_bucket: Option<String>,
    #[serde(default)]
    pub aps_base_url: Option<String>,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(
            config::Config::builder().add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn load(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        let cfg: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .context("invalid gateway configuration")?;
        cfg.normalize().validate()
    }

    fn normalize(mut self) -> Self {
        self.aps_client_id = Self::normalize_opt(self.aps_client_id.take());
        self.aps_client_secret = Self::normalize_opt(self.aps_client_secret.take());
        self.aps_bucket = Self::normalize_opt(self.aps_bucket.take());
        self.aps_base_url = Self::normalize_opt(self.aps_base_url.take());
        self
    }

    fn normalize_opt(value: Option<String>) -> Option<String> {
        value.and_then(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.aps_client_id.is_none() || self.aps_client_secret.is_none() {
            bail!("APS_CLIENT_ID and APS_CLIENT_SECRET must be set");
        }
        Ok(self)
    }

    /// Bucket holding the uploaded models; derived from the client id when
    /// not configured.
    pub fn bucket(&self) -> String {
        match (&self.aps_bucket, &self.aps_client_id) {
            (Some(bucket), _) => bucket.clone(),
            (None, Some(client_id)) => format!("{}-basic-app", client_id.to_lowercase()),
            (None, None) => "basic-app".to_string(),
        }
    }

    pub fn client_config(&self) -> ApsClientConfig {
        ApsClientConfig::new(
            self.aps_client_id.clone().unwrap_or_default(),
            self.aps_client_secret.clone().unwrap_or_default(),
            self.bucket(),
        )
        .with_base_url(
            self.aps_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )
        .with_timeout(Duration::from_secs(self.upstream_timeout_secs))
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_static_dir() -> String {
    "wwwroot".to_string()
}

fn default_max_upload_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_request_timeout() -> u64 {
    300
}

fn default_upstream_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
    }

    #[test]
    fn defaults_apply_and_bucket_derives_from_client_id() {
        let cfg = AppConfig::load(
            builder()
                .set_override("aps_client_id", "AbCdEf")
                .unwrap()
                .set_override("aps_client_secret", "s3cret")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.static_dir, "wwwroot");
        assert_eq!(cfg.bucket(), "abcdef-basic-app");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(300));

        let client = cfg.client_config();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, Duration::from_secs(120));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let cfg = AppConfig::load(
            builder()
                .set_override("aps_client_id", "id")
                .unwrap()
                .set_override("aps_client_secret", "secret")
                .unwrap()
                .set_override("aps_bucket", "   ")
                .unwrap()
                .set_override("max_upload_bytes", 1024)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(cfg.aps_bucket, None);
        assert_eq!(cfg.bucket(), "id-basic-app");
        assert_eq!(cfg.max_upload_bytes(), 1024);
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = AppConfig::load(
            builder()
                .set_override("aps_client_id", "id")
                .unwrap()
                .set_override("aps_client_secret", "")
                .unwrap(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("APS_CLIENT_SECRET"));
    }
}
