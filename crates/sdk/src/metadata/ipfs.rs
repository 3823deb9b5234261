//! # IPFS メタデータサービス
//!
//! 取得は公開ゲートウェイ、保存はピンニングサービスを中継するアップロードAPIを使う。
//! アップロードAPIは `{"hash": "..."}` を返す。

use rwa_types::{AssetMetadata, MetadataProvider};
use serde::Deserialize;

use super::{fetch_json, MetadataService};
use crate::error::SdkError;

pub const IPFS_GATEWAY_URL: &str = "https://ipfs.io/ipfs";

/// ポータルのアップロードAPI
pub const DEFAULT_IPFS_UPLOAD_URL: &str = "http://localhost:3000/api/ipfs/upload";

#[derive(Deserialize)]
struct UploadResponse {
    hash: String,
}

pub struct IpfsMetadataService {
    gateway_url: String,
    upload_url: String,
    http: reqwest::Client,
}

impl Default for IpfsMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl IpfsMetadataService {
    pub fn new() -> Self {
        Self::with_urls(IPFS_GATEWAY_URL, DEFAULT_IPFS_UPLOAD_URL)
    }

    pub fn with_urls(gateway_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl MetadataService for IpfsMetadataService {
    fn provider(&self) -> MetadataProvider {
        MetadataProvider::Ipfs
    }

    async fn upload_metadata(&self, metadata: &AssetMetadata) -> Result<String, SdkError> {
        let response = self
            .http
            .post(&self.upload_url)
            .json(metadata)
            .send()
            .await
            .map_err(|e| SdkError::Metadata(format!("IPFSへのアップロードに失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::Metadata(format!(
                "IPFSへのアップロードに失敗: HTTP {status}"
            )));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Metadata(format!("アップロード結果のパースに失敗: {e}")))?;

        tracing::info!(hash = %body.hash, "メタデータをIPFSに保存しました");
        Ok(body.hash)
    }

    async fn fetch_metadata(&self, hash: &str) -> Option<AssetMetadata> {
        match fetch_json(&self.http, &self.metadata_uri(hash)).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(hash, error = %e, "IPFSからのメタデータ取得に失敗しました");
                None
            }
        }
    }

    fn metadata_uri(&self, hash: &str) -> String {
        format!("{}/{hash}", self.gateway_url)
    }
}
