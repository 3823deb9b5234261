//! # オフチェーンメタデータ
//!
//! 資産の `metadata_uri` が指すJSONの作成・検証・保存・取得。
//! 保存先は `MetadataService` トレイトで抽象化し、Arweave / IPFS / ローカル（開発用）を実装する。

pub mod arweave;
pub mod ipfs;
pub mod local;

pub use arweave::ArweaveMetadataService;
pub use ipfs::IpfsMetadataService;
pub use local::LocalMetadataService;

use rwa_types::{AssetMetadata, MetadataAttribute, MetadataFile, MetadataProperties, MetadataProvider};
use serde_json::Value;

use crate::error::SdkError;

/// メタデータ保存先の抽象インターフェース。
#[async_trait::async_trait]
pub trait MetadataService: Send + Sync {
    fn provider(&self) -> MetadataProvider;

    /// メタデータを保存し、保存先での識別子（Arweaveトランザクション ID、IPFSハッシュ等）を返す。
    async fn upload_metadata(&self, metadata: &AssetMetadata) -> Result<String, SdkError>;

    /// 識別子からメタデータを取得する。
    /// 取得・パースに失敗した場合は警告ログを出して `None` を返す。
    async fn fetch_metadata(&self, id: &str) -> Option<AssetMetadata>;

    /// 識別子からオンチェーンに記録するURIを組み立てる。
    fn metadata_uri(&self, id: &str) -> String;
}

/// プロバイダに対応するメタデータサービスを生成する。
pub fn create_metadata_service(provider: MetadataProvider) -> Box<dyn MetadataService> {
    match provider {
        MetadataProvider::Arweave => Box::new(ArweaveMetadataService::new()),
        MetadataProvider::Ipfs => Box::new(IpfsMetadataService::new()),
        MetadataProvider::Local => Box::new(LocalMetadataService::new()),
    }
}

/// 資産メタデータを組み立てる。画像は `image/png` の単一ファイルとして登録する。
pub fn create_asset_metadata(
    name: &str,
    description: &str,
    image: &str,
    attributes: Vec<MetadataAttribute>,
    external_url: Option<&str>,
) -> AssetMetadata {
    AssetMetadata {
        name: name.to_string(),
        description: description.to_string(),
        image: image.to_string(),
        external_url: external_url.unwrap_or_default().to_string(),
        attributes,
        properties: MetadataProperties {
            files: vec![MetadataFile {
                uri: image.to_string(),
                file_type: "image/png".to_string(),
            }],
            category: "image".to_string(),
        },
    }
}

/// 任意のJSONがメタデータとして有効かどうかを検証する。
///
/// - `name`, `description`, `image` が空でないこと
/// - `attributes` が配列であること
/// - 各属性が空でない `trait_type` と `value` キーを持つこと
pub fn validate_metadata(metadata: &Value) -> bool {
    for field in ["name", "description", "image"] {
        if !metadata.get(field).is_some_and(is_truthy) {
            return false;
        }
    }

    let Some(attributes) = metadata.get("attributes").and_then(|a| a.as_array()) else {
        return false;
    };

    attributes.iter().all(|attr| {
        attr.get("trait_type").is_some_and(is_truthy) && attr.get("value").is_some()
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `metadata_uri` を取得用のHTTP(S) URLに解決する。
///
/// - `http(s)://...` はそのまま
/// - `ar://<id>` は `https://arweave.net/<id>`
/// - `ipfs://<hash>` は `https://ipfs.io/ipfs/<hash>`
/// - それ以外（`local://` 等）はプロセス外から取得できないため `None`
pub fn resolve_metadata_url(uri: &str) -> Option<String> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        Some(uri.to_string())
    } else if let Some(id) = uri.strip_prefix("ar://") {
        Some(format!("{}/{id}", arweave::ARWEAVE_BASE_URL))
    } else {
        uri.strip_prefix("ipfs://")
            .map(|hash| format!("{}/{hash}", ipfs::IPFS_GATEWAY_URL))
    }
}

/// `metadata_uri` からメタデータを取得する。失敗時は警告ログを出して `None`。
pub async fn fetch_metadata_by_uri(http: &reqwest::Client, uri: &str) -> Option<AssetMetadata> {
    let Some(url) = resolve_metadata_url(uri) else {
        tracing::warn!(uri, "取得できないメタデータURIです");
        return None;
    };
    match fetch_json(http, &url).await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!(uri, error = %e, "メタデータの取得に失敗しました");
            None
        }
    }
}

/// URLからメタデータJSONを取得する。
pub(crate) async fn fetch_json(http: &reqwest::Client, url: &str) -> Result<AssetMetadata, SdkError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| SdkError::Metadata(format!("メタデータの取得に失敗 ({url}): {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SdkError::Metadata(format!(
            "メタデータの取得に失敗 ({url}): HTTP {status}"
        )));
    }

    response
        .json::<AssetMetadata>()
        .await
        .map_err(|e| SdkError::Metadata(format!("メタデータのパースに失敗 ({url}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::spawn_router;
    use serde_json::json;

    fn valid_json() -> Value {
        json!({
            "name": "Tokyo Office",
            "description": "Grade A office",
            "image": "https://arweave.net/img",
            "attributes": [
                {"trait_type": "Location", "value": "Tokyo"},
                {"trait_type": "Floors", "value": 12}
            ]
        })
    }

    #[test]
    fn test_create_asset_metadata() {
        let metadata = create_asset_metadata(
            "Tokyo Office",
            "Grade A office",
            "https://arweave.net/img",
            vec![MetadataAttribute {
                trait_type: "Location".to_string(),
                value: "Tokyo".into(),
            }],
            None,
        );
        assert_eq!(metadata.external_url, "");
        assert_eq!(metadata.properties.category, "image");
        assert_eq!(metadata.properties.files.len(), 1);
        assert_eq!(metadata.properties.files[0].uri, "https://arweave.net/img");
        assert_eq!(metadata.properties.files[0].file_type, "image/png");

        // 生成したメタデータは検証を通る
        assert!(validate_metadata(&serde_json::to_value(&metadata).unwrap()));
    }

    #[test]
    fn test_validate_metadata() {
        assert!(validate_metadata(&valid_json()));

        let mut missing_image = valid_json();
        missing_image.as_object_mut().unwrap().remove("image");
        assert!(!validate_metadata(&missing_image));

        let mut empty_name = valid_json();
        empty_name["name"] = json!("");
        assert!(!validate_metadata(&empty_name));

        let mut attrs_not_array = valid_json();
        attrs_not_array["attributes"] = json!({"trait_type": "x", "value": 1});
        assert!(!validate_metadata(&attrs_not_array));

        let mut attr_without_value = valid_json();
        attr_without_value["attributes"] = json!([{"trait_type": "Location"}]);
        assert!(!validate_metadata(&attr_without_value));

        let mut attr_without_trait = valid_json();
        attr_without_trait["attributes"] = json!([{"trait_type": "", "value": "x"}]);
        assert!(!validate_metadata(&attr_without_trait));

        // 属性は空配列でもよい
        let mut no_attrs = valid_json();
        no_attrs["attributes"] = json!([]);
        assert!(validate_metadata(&no_attrs));

        assert!(!validate_metadata(&json!("not an object")));
    }

    #[test]
    fn test_resolve_metadata_url() {
        assert_eq!(
            resolve_metadata_url("https://example.com/m.json").as_deref(),
            Some("https://example.com/m.json")
        );
        assert_eq!(
            resolve_metadata_url("ar://abc").as_deref(),
            Some("https://arweave.net/abc")
        );
        assert_eq!(
            resolve_metadata_url("ipfs://Qm123").as_deref(),
            Some("https://ipfs.io/ipfs/Qm123")
        );
        assert_eq!(resolve_metadata_url("local://local_1_abc"), None);
        assert_eq!(resolve_metadata_url(""), None);
    }

    #[tokio::test]
    async fn test_fetch_metadata_by_uri() {
        let body = serde_json::to_value(create_asset_metadata(
            "Art",
            "Painting",
            "https://example.com/a.png",
            vec![],
            Some("https://example.com"),
        ))
        .unwrap();
        let router = axum::Router::new()
            .route(
                "/meta.json",
                axum::routing::get(move || {
                    let body = body.clone();
                    async move { axum::Json(body) }
                }),
            )
            .route("/broken.json", axum::routing::get(|| async { "not json" }));
        let base = spawn_router(router).await;
        let http = reqwest::Client::new();

        let metadata = fetch_metadata_by_uri(&http, &format!("{base}/meta.json"))
            .await
            .unwrap();
        assert_eq!(metadata.name, "Art");
        assert_eq!(metadata.external_url, "https://example.com");

        assert!(fetch_metadata_by_uri(&http, &format!("{base}/broken.json")).await.is_none());
        assert!(fetch_metadata_by_uri(&http, &format!("{base}/missing.json")).await.is_none());
        assert!(fetch_metadata_by_uri(&http, "local://x").await.is_none());
    }

    #[test]
    fn test_create_metadata_service() {
        assert_eq!(
            create_metadata_service(MetadataProvider::Arweave).provider(),
            MetadataProvider::Arweave
        );
        assert_eq!(
            create_metadata_service(MetadataProvider::Ipfs).provider(),
            MetadataProvider::Ipfs
        );
        let local = create_metadata_service(MetadataProvider::default());
        assert_eq!(local.provider(), MetadataProvider::Local);
        assert_eq!(local.metadata_uri("abc"), "local://abc");
    }
}
