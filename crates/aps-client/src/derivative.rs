use serde::Serialize;
use tracing::info;

use crate::{
    client::{check, ApsClient},
    ApsError, Manifest, ModelUrn, TranslationJob,
};

#[derive(Debug, Serialize)]
struct JobPayload<'a> {
    input: JobInput<'a>,
    output: JobOutput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobInput<'a> {
    urn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    compressed_urn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root_filename: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JobOutput {
    formats: Vec<OutputFormat>,
}

#[derive(Debug, Serialize)]
struct OutputFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    views: Vec<&'static str>,
}

impl<'a> JobPayload<'a> {
    fn svf2(urn: &'a ModelUrn, root_filename: Option<&'a str>) -> Self {
        Self {
            input: JobInput {
                urn: urn.as_str(),
                compressed_urn: root_filename.map(|_| true),
                root_filename,
            },
            output: JobOutput {
                formats: vec![OutputFormat {
                    kind: "svf2",
                    views: vec!["2d", "3d"],
                }],
            },
        }
    }
}

impl ApsClient {
    pub(crate) async fn submit_job(
        &self,
        urn: &ModelUrn,
        root_filename: Option<&str>,
    ) -> Result<TranslationJob, ApsError> {
        let token = self.bearer().await?;
        let res = self
            .http
            .post(self.url("/modelderivative/v2/designdata/job"))
            .bearer_auth(&token)
            .header("x-ads-force", "true")
            .json(&JobPayload::svf2(urn, root_filename))
            .send()
            .await?;
        let job: TranslationJob = check(res).await?.json().await?;
        info!(urn = %urn, result = %job.result, "translation job submitted");
        Ok(job)
    }

    pub(crate) async fn fetch_manifest(&self, urn: &ModelUrn) -> Result<Manifest, ApsError> {
        let token = self.bearer().await?;
        let res = self
            .http
            .get(self.url(&format!(
                "/modelderivative/v2/designdata/{}/manifest",
                urn.as_str()
            )))
            .bearer_auth(&token)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_upload_job_omits_archive_fields() {
        let urn = ModelUrn::encode("urn:adsk.objects:os.object:b/house.rvt");
        let body = serde_json::to_value(JobPayload::svf2(&urn, None)).unwrap();
        assert_eq!(
            body,
            json!({
                "input": { "urn": urn.as_str() },
                "output": { "formats": [ { "type": "svf2", "views": ["2d", "3d"] } ] }
            })
        );
    }

    #[test]
    fn archive_job_names_its_root_file() {
        let urn = ModelUrn::encode("urn:adsk.objects:os.object:b/site.zip");
        let body = serde_json::to_value(JobPayload::svf2(&urn, Some("main.rvt"))).unwrap();
        assert_eq!(body["input"]["compressedUrn"], json!(true));
        assert_eq!(body["input"]["rootFilename"], json!("main.rvt"));
    }
}
