//! Object store client
//!
//! Uploads image bytes and returns a durable public URL. The production
//! adapter talks to the Cloudinary upload API with signed requests.

use crate::config::{ObjectStoreConfig, SignatureAlgorithm};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while uploading to the object store
#[derive(Error, Debug)]
pub enum UploadError {
    /// Credentials are missing from the configuration
    #[error("Object store is not configured: {0}")]
    NotConfigured(String),

    /// The HTTP request could not be sent or its body could not be read
    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Upload rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message reported by the service
        message: String,
    },

    /// The service answered 2xx but the body had no usable URL
    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Location of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Public URL of the object
    pub url: String,
}

/// Binary upload port
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` with the given MIME type
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<StoredObject, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Cloudinary upload API client
pub struct CloudinaryClient {
    client: reqwest::Client,
    config: ObjectStoreConfig,
}

impl CloudinaryClient {
    /// Build a client with the configured request timeout
    pub fn new(config: ObjectStoreConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    fn ensure_configured(&self) -> Result<(), UploadError> {
        let missing: Vec<&str> = [
            ("cloud_name", &self.config.cloud_name),
            ("api_key", &self.config.api_key),
            ("api_secret", &self.config.api_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(UploadError::NotConfigured(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }
}

/// Signature over the signed upload parameters
///
/// Parameters are joined as `k=v` pairs in alphabetical order, the API
/// secret is appended, and the result is hashed with `algorithm`.
pub fn sign_params(
    params: &[(&str, &str)],
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let mut sorted: Vec<_> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    match algorithm {
        SignatureAlgorithm::Sha1 => digest_hex::<Sha1>(&joined, api_secret),
        SignatureAlgorithm::Sha256 => digest_hex::<Sha256>(&joined, api_secret),
    }
}

fn digest_hex<D: Digest>(joined: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn file_name_for(mime_type: &str) -> String {
    let ext = match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    };
    format!("upload.{}", ext)
}

#[async_trait]
impl ObjectStore for CloudinaryClient {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<StoredObject, UploadError> {
        self.ensure_configured()?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
            self.config.signature_algorithm,
        );

        let size = bytes.len();
        let file = Part::bytes(bytes)
            .file_name(file_name_for(mime_type))
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part("file", file);
        if !self.config.folder.is_empty() {
            form = form.text("folder", self.config.folder.clone());
        }

        let url = self.upload_url();
        tracing::debug!(url = %url, mime_type = %mime_type, size, "Uploading object");

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            tracing::error!(
                status_code = status.as_u16(),
                error = %message,
                "Object store rejected upload"
            );
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = response.json().await?;
        let url = parsed
            .secure_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| UploadError::InvalidResponse("missing secure_url".to_string()))?;

        Ok(StoredObject { url })
    }
}
