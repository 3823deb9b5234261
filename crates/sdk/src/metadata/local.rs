//! # ローカル メタデータサービス
//!
//! 開発用のインメモリストア。プロセス終了で内容は失われる。

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rwa_types::{AssetMetadata, MetadataProvider};
use tokio::sync::RwLock;

use super::MetadataService;
use crate::error::SdkError;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_RANDOM_LEN: usize = 9;

#[derive(Default)]
pub struct LocalMetadataService {
    storage: RwLock<HashMap<String, AssetMetadata>>,
}

impl LocalMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }
}

/// `local_<UNIXミリ秒>_<base36の9文字>` 形式のIDを生成する。
fn generate_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_RANDOM_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("local_{millis}_{suffix}")
}

#[async_trait::async_trait]
impl MetadataService for LocalMetadataService {
    fn provider(&self) -> MetadataProvider {
        MetadataProvider::Local
    }

    async fn upload_metadata(&self, metadata: &AssetMetadata) -> Result<String, SdkError> {
        let id = generate_id();
        self.storage.write().await.insert(id.clone(), metadata.clone());
        tracing::debug!(id = %id, "メタデータをローカルに保存しました");
        Ok(id)
    }

    async fn fetch_metadata(&self, id: &str) -> Option<AssetMetadata> {
        let id = id.strip_prefix("local://").unwrap_or(id);
        self.storage.read().await.get(id).cloned()
    }

    fn metadata_uri(&self, id: &str) -> String {
        format!("local://{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::create_asset_metadata;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "local");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), ID_RANDOM_LEN);
        assert!(parts[2].bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_ne!(generate_id(), id);
    }

    #[tokio::test]
    async fn test_upload_and_fetch() {
        let service = LocalMetadataService::new();
        let metadata = create_asset_metadata("Gold", "1kg bar", "https://x/gold.png", vec![], None);

        let id = service.upload_metadata(&metadata).await.unwrap();
        assert_eq!(service.len().await, 1);
        assert_eq!(service.fetch_metadata(&id).await, Some(metadata.clone()));
        // URI形式でも取得できる
        let uri = service.metadata_uri(&id);
        assert!(uri.starts_with("local://local_"));
        assert_eq!(service.fetch_metadata(&uri).await, Some(metadata));

        assert_eq!(service.fetch_metadata("local_0_missing").await, None);
    }
}
