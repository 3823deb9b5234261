//! # SDK設定
//!
//! 環境変数から接続先・署名鍵・メタデータプロバイダ・リトライ方針を読み込む。
//!
//! | 変数 | 既定値 |
//! |------|--------|
//! | `RWA_NETWORK` | `devnet` |
//! | `RWA_RPC_URL` | ネットワークの既定URL |
//! | `RWA_KEYPAIR` | なし（Base58の64バイト秘密鍵） |
//! | `RWA_KEYPAIR_PATH` | なし（JSONバイト配列のキーペアファイル） |
//! | `RWA_METADATA_PROVIDER` | `local` |
//! | `RWA_MAX_RETRIES` | `3` |
//! | `RWA_RETRY_BASE_MS` | `1000` |

use std::time::Duration;

use base58::FromBase58;
use rwa_types::{MetadataProvider, Network};
use solana_sdk::signature::Keypair;

use crate::constants::network_config;
use crate::error::SdkError;
use crate::retry::RetryPolicy;

/// SDK設定。
#[derive(Debug)]
pub struct SdkConfig {
    pub network: Network,
    pub rpc_url: String,
    /// 署名鍵（読み取り専用の操作では不要）
    pub keypair: Option<Keypair>,
    pub metadata_provider: MetadataProvider,
    pub retry: RetryPolicy,
}

impl SdkConfig {
    /// プロセス環境変数から読み込む。
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から読み込む。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SdkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("RWA_NETWORK") {
            Some(s) => s.parse::<Network>().map_err(SdkError::Config)?,
            None => Network::default(),
        };

        let rpc_url = lookup("RWA_RPC_URL").unwrap_or_else(|| network_config(network).url.to_string());

        let keypair = if let Some(secret) = lookup("RWA_KEYPAIR") {
            Some(keypair_from_base58(&secret)?)
        } else if let Some(path) = lookup("RWA_KEYPAIR_PATH") {
            let keypair = solana_sdk::signer::keypair::read_keypair_file(&path).map_err(|e| {
                SdkError::Config(format!("キーペアファイルの読み込みに失敗 ({path}): {e}"))
            })?;
            Some(keypair)
        } else {
            None
        };

        let metadata_provider = match lookup("RWA_METADATA_PROVIDER") {
            Some(s) => s.parse::<MetadataProvider>().map_err(SdkError::Config)?,
            None => MetadataProvider::default(),
        };

        let defaults = RetryPolicy::default();
        let max_retries = match lookup("RWA_MAX_RETRIES") {
            Some(s) => s
                .parse::<u32>()
                .map_err(|e| SdkError::Config(format!("RWA_MAX_RETRIESが不正です: {e}")))?,
            None => defaults.max_retries,
        };
        let base_delay = match lookup("RWA_RETRY_BASE_MS") {
            Some(s) => Duration::from_millis(
                s.parse::<u64>()
                    .map_err(|e| SdkError::Config(format!("RWA_RETRY_BASE_MSが不正です: {e}")))?,
            ),
            None => defaults.base_delay,
        };

        Ok(Self {
            network,
            rpc_url,
            keypair,
            metadata_provider,
            retry: RetryPolicy::new(max_retries, base_delay),
        })
    }
}

/// Base58エンコードされた64バイトの秘密鍵からキーペアを復元する。
pub fn keypair_from_base58(secret: &str) -> Result<Keypair, SdkError> {
    let bytes = secret
        .trim()
        .from_base58()
        .map_err(|e| SdkError::Config(format!("RWA_KEYPAIRのBase58デコードに失敗: {e:?}")))?;
    if bytes.len() != 64 {
        return Err(SdkError::Config(format!(
            "RWA_KEYPAIRは64バイトである必要があります: {} bytes",
            bytes.len()
        )));
    }
    #[allow(deprecated)]
    Keypair::from_bytes(&bytes).map_err(|e| SdkError::Config(format!("キーペアの復元に失敗: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SdkConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
        assert!(config.keypair.is_none());
        assert_eq!(config.metadata_provider, MetadataProvider::Local);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let keypair = Keypair::new();
        let secret = keypair.to_base58_string();
        let config = SdkConfig::from_lookup(lookup_from(&[
            ("RWA_NETWORK", "localnet"),
            ("RWA_RPC_URL", "http://127.0.0.1:9999"),
            ("RWA_KEYPAIR", &secret),
            ("RWA_METADATA_PROVIDER", "arweave"),
            ("RWA_MAX_RETRIES", "5"),
            ("RWA_RETRY_BASE_MS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.network, Network::Localnet);
        assert_eq!(config.rpc_url, "http://127.0.0.1:9999");
        assert_eq!(config.keypair.unwrap().pubkey(), keypair.pubkey());
        assert_eq!(config.metadata_provider, MetadataProvider::Arweave);
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_millis(10)));
    }

    #[test]
    fn test_network_default_url() {
        let config = SdkConfig::from_lookup(lookup_from(&[("RWA_NETWORK", "mainnet")])).unwrap();
        assert_eq!(config.rpc_url, "https://api.mainnet-beta.solana.com");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SdkConfig::from_lookup(lookup_from(&[("RWA_NETWORK", "moon")])),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            SdkConfig::from_lookup(lookup_from(&[("RWA_MAX_RETRIES", "many")])),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            SdkConfig::from_lookup(lookup_from(&[("RWA_KEYPAIR", "abc")])),
            Err(SdkError::Config(_))
        ));
    }
}
