use crate::config::PublishConfig;
use crate::traits::AssetPublisher;
use crate::types::{DigestError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Uploads remote images to Cloudinary with a fixed fill-crop profile
pub struct CloudinaryPublisher {
    client: Client,
    config: PublishConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

impl CloudinaryPublisher {
    pub fn new(config: PublishConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// Incoming transformation: fill-crop to the configured size around the
    /// detected subject, automatic quality and format.
    pub fn transformation(&self) -> String {
        format!(
            "c_fill,f_auto,g_auto,h_{},q_auto:good,w_{}",
            self.config.height, self.config.width
        )
    }

    /// Parameters covered by the signature, sorted by name
    fn signed_params(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp.to_string()),
            ("transformation", self.transformation()),
        ]
    }

    async fn upload(&self, source_url: &str) -> Result<String> {
        let (Some(cloud_name), Some(api_key), Some(api_secret)) = (
            self.config.cloud_name.as_deref(),
            self.config.api_key.as_deref(),
            self.config.api_secret.as_deref(),
        ) else {
            return Err(DigestError::Config("image hosting credentials not set".to_string()));
        };

        let timestamp = Utc::now().timestamp();
        let params = self.signed_params(timestamp);
        let signature = sign(&params, api_secret);

        let mut form = Form::new()
            .text("file", source_url.to_string())
            .text("api_key", api_key.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let url = format!("{}/{}/image/upload", self.config.api_base, cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body: UploadResponse = response.json().await?;

        match (status.is_success(), body.secure_url, body.error) {
            (true, Some(secure_url), _) => Ok(secure_url),
            (_, _, Some(error)) => Err(DigestError::Upload {
                status: status.as_u16(),
                message: error.message,
            }),
            _ => Err(DigestError::Upload {
                status: status.as_u16(),
                message: "response carried no secure_url".to_string(),
            }),
        }
    }
}

#[async_trait]
impl AssetPublisher for CloudinaryPublisher {
    async fn publish(&self, source_url: &str) -> Result<String> {
        debug!("Uploading image: {}", source_url);
        let seconds = self.config.timeout_seconds;
        match tokio::time::timeout(Duration::from_secs(seconds), self.upload(source_url)).await {
            Ok(result) => result,
            Err(_) => Err(DigestError::Timeout { seconds }),
        }
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` followed by the API secret
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
