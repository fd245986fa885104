pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

pub use s3::S3Storage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid presign request: {0}")]
    Presign(String),

    #[error("Object storage request failed: {0}")]
    Request(String),
}

/// A time-limited URL the client can use directly against the bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrl {
    pub url: String,
    /// Headers the client must send with the request for the signature to hold.
    pub headers: BTreeMap<String, String>,
    pub expires_at: DateTime<Utc>,
}

/// Object storage as the API uses it: presign, and delete.
/// File bytes never pass through this service.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError>;

    async fn presign_download(&self, key: &str, expires_in: Duration) -> Result<PresignedUrl, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Reduce a client-supplied file name to something safe inside an object key.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
