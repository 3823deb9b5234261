//! # Arweave メタデータサービス

use rwa_types::{AssetMetadata, MetadataProvider};
use serde::Deserialize;
use serde_json::json;

use super::{fetch_json, MetadataService};
use crate::error::SdkError;

pub const ARWEAVE_BASE_URL: &str = "https://arweave.net";

const APP_NAME: &str = "RWA-Portal";
const APP_VERSION: &str = "1.0.0";

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// Arweaveゲートウェイ経由でメタデータ・画像を保存する。
pub struct ArweaveMetadataService {
    base_url: String,
    http: reqwest::Client,
}

impl Default for ArweaveMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl ArweaveMetadataService {
    pub fn new() -> Self {
        Self::with_base_url(ARWEAVE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 画像を保存し、トランザクションIDを返す。
    pub async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, SdkError> {
        let response = self
            .http
            .post(format!("{}/tx", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| SdkError::Metadata(format!("画像のアップロードに失敗: {e}")))?;
        parse_upload_response(response, "画像").await
    }

    /// メタデータURIの末尾パスセグメント（トランザクションID）を取り出す。
    /// URLとして解釈できない場合は `None`。
    pub fn parse_metadata_uri(uri: &str) -> Option<String> {
        let url = reqwest::Url::parse(uri).ok()?;
        url.path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(|s| s.to_string())
    }
}

async fn parse_upload_response(response: reqwest::Response, what: &str) -> Result<String, SdkError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SdkError::Metadata(format!(
            "{what}のアップロードに失敗: HTTP {status}"
        )));
    }
    let body: UploadResponse = response
        .json()
        .await
        .map_err(|e| SdkError::Metadata(format!("アップロード結果のパースに失敗: {e}")))?;
    Ok(body.id)
}

#[async_trait::async_trait]
impl MetadataService for ArweaveMetadataService {
    fn provider(&self) -> MetadataProvider {
        MetadataProvider::Arweave
    }

    async fn upload_metadata(&self, metadata: &AssetMetadata) -> Result<String, SdkError> {
        let data = serde_json::to_string(metadata)
            .map_err(|e| SdkError::Serialization(format!("メタデータのシリアライズに失敗: {e}")))?;
        let request = json!({
            "data": data,
            "tags": [
                {"name": "Content-Type", "value": "application/json"},
                {"name": "App-Name", "value": APP_NAME},
                {"name": "App-Version", "value": APP_VERSION},
            ],
        });

        let response = self
            .http
            .post(format!("{}/tx", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Metadata(format!("メタデータのアップロードに失敗: {e}")))?;
        let id = parse_upload_response(response, "メタデータ").await?;
        tracing::info!(id = %id, "メタデータをArweaveに保存しました");
        Ok(id)
    }

    async fn fetch_metadata(&self, id: &str) -> Option<AssetMetadata> {
        match fetch_json(&self.http, &self.metadata_uri(id)).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(id, error = %e, "Arweaveからのメタデータ取得に失敗しました");
                None
            }
        }
    }

    fn metadata_uri(&self, id: &str) -> String {
        format!("{}/{id}", self.base_url)
    }
}
