//! Object storage (OSS) calls: bucket bootstrap, paginated listing, signed
//! S3 uploads and deletion.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::{
    client::{check, ApsClient},
    ApsError, ObjectEntry,
};

const LIST_PAGE_SIZE: u32 = 64;

#[derive(Debug, Deserialize)]
struct ObjectPage {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUpload {
    upload_key: String,
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteUpload<'a> {
    upload_key: &'a str,
}

impl ApsClient {
    /// Creates the configured bucket on first use when it does not exist.
    pub async fn ensure_bucket(&self) -> Result<(), ApsError> {
        self.bucket_ready
            .get_or_try_init(|| self.check_bucket())
            .await
            .map(|_| ())
    }

    async fn check_bucket(&self) -> Result<(), ApsError> {
        let token = self.bearer().await?;
        let res = self
            .http
            .get(self.url(&format!("{}/details", self.bucket_path())))
            .bearer_auth(&token)
            .send()
            .await?;
        match check(res).await {
            Ok(_) => Ok(()),
            Err(ApsError::NotFound) => self.create_bucket(&token).await,
            Err(err) => Err(err),
        }
    }

    async fn create_bucket(&self, token: &str) -> Result<(), ApsError> {
        info!(bucket = %self.config.bucket, "creating aps bucket");
        let res = self
            .http
            .post(self.url("/oss/v2/buckets"))
            .bearer_auth(token)
            .json(&json!({
                "bucketKey": self.config.bucket,
                "policyKey": "persistent",
            }))
            .send()
            .await?;
        // Another instance may have won the race.
        if res.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        check(res).await.map(|_| ())
    }

    pub(crate) async fn list_bucket_objects(&self) -> Result<Vec<ObjectEntry>, ApsError> {
        let token = self.bearer().await?;
        let url = self.url(&format!("{}/objects", self.bucket_path()));
        let mut objects = Vec::new();
        let mut start_at: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("limit", LIST_PAGE_SIZE.to_string())]);
            if let Some(cursor) = &start_at {
                req = req.query(&[("startAt", cursor)]);
            }
            let page: ObjectPage = check(req.send().await?).await?.json().await?;
            objects.extend(page.items);

            start_at = page.next.as_deref().and_then(start_at_cursor);
            if start_at.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    pub(crate) async fn upload_file(
        &self,
        object_key: &str,
        source: &Path,
    ) -> Result<ObjectEntry, ApsError> {
        let token = self.bearer().await?;
        let part_size = self.config.part_size;
        let size = tokio::fs::metadata(source).await?.len();
        let parts = size.div_ceil(part_size).max(1);
        let mut file = tokio::fs::File::open(source).await?;
        let mut upload_key: Option<String> = None;
        let mut part = 1;

        debug!(object_key, size, parts, "uploading object");
        while part <= parts {
            let batch = (parts - part + 1).min(self.config.max_urls_per_request);
            let signed = self
                .signed_upload_urls(&token, object_key, part, batch, upload_key.as_deref())
                .await?;
            if (signed.urls.len() as u64) < batch {
                return Err(ApsError::MissingUploadUrl {
                    expected: batch as usize,
                    got: signed.urls.len(),
                });
            }

            for url in signed.urls.iter().take(batch as usize) {
                let offset = (part - 1) * part_size;
                let len = (size - offset).min(part_size);
                let mut chunk = vec![0u8; len as usize];
                file.read_exact(&mut chunk).await?;
                let res = self.http.put(url).body(chunk).send().await?;
                check(res).await?;
                part += 1;
            }
            upload_key = Some(signed.upload_key);
        }

        let upload_key = upload_key.unwrap_or_default();
        let res = self
            .http
            .post(self.url(&format!("{}/signeds3upload", self.object_path(object_key))))
            .bearer_auth(&token)
            .json(&CompleteUpload {
                upload_key: &upload_key,
            })
            .send()
            .await?;
        let entry: ObjectEntry = check(res).await?.json().await?;
        info!(object_key = %entry.object_key, object_id = %entry.object_id, "object uploaded");
        Ok(entry)
    }

    async fn signed_upload_urls(
        &self,
        token: &str,
        object_key: &str,
        first_part: u64,
        parts: u64,
        upload_key: Option<&str>,
    ) -> Result<SignedUpload, ApsError> {
        let mut req = self
            .http
            .get(self.url(&format!("{}/signeds3upload", self.object_path(object_key))))
            .bearer_auth(token)
            .query(&[
                ("firstPart", first_part.to_string()),
                ("parts", parts.to_string()),
            ]);
        if let Some(key) = upload_key {
            req = req.query(&[("uploadKey", key)]);
        }
        Ok(check(req.send().await?).await?.json().await?)
    }

    pub(crate) async fn remove_object(&self, object_key: &str) -> Result<(), ApsError> {
        let token = self.bearer().await?;
        let res = self
            .http
            .delete(self.url(&self.object_path(object_key)))
            .bearer_auth(&token)
            .send()
            .await?;
        check(res).await?;
        info!(object_key, bucket = %self.config.bucket, "object deleted");
        Ok(())
    }
}

/// Extracts the `startAt` cursor from an OSS `next` link.
fn start_at_cursor(next: &str) -> Option<String> {
    let url = url::Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "startAt")
        .map(|(_, value)| value.into_owned())
}
