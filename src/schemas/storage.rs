use serde::{Deserialize, Serialize};

use crate::services::storage::StorageBucket;

#[derive(Debug, Deserialize)]
pub(crate) struct PresignUploadRequest {
    pub(crate) bucket: StorageBucket,
    pub(crate) filename: String,
    #[serde(alias = "contentType")]
    pub(crate) content_type: String,
    #[serde(alias = "size")]
    pub(crate) size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PresignUploadResponse {
    pub(crate) key: String,
    pub(crate) upload_url: String,
    pub(crate) expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PresignDownloadRequest {
    pub(crate) bucket: StorageBucket,
    pub(crate) key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PresignDownloadResponse {
    pub(crate) key: String,
    pub(crate) download_url: String,
    pub(crate) expires_in: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) key: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
}
