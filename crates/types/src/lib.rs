//! # RWA Portal 共有型定義
//!
//! SDK・CLIで共有するデータ構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - Base58: Solanaアドレス、公開鍵、トランザクション署名
//! - 金額: USDC・分割トークンは6桁、SOLは9桁の最小単位（u64）
//! - JSONのフィールド名はオフチェーンメタデータ標準（snake_case）に従う

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 資産種別
// ---------------------------------------------------------------------------

/// 資産の種別。
/// Borshタグはオンチェーンプログラムの宣言順（Land = 0 ... Other = 5）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum AssetType {
    Land,
    Art,
    Carbon,
    RealEstate,
    Commodity,
    Other,
}

impl AssetType {
    /// 全種別（宣言順）
    pub const ALL: [AssetType; 6] = [
        AssetType::Land,
        AssetType::Art,
        AssetType::Carbon,
        AssetType::RealEstate,
        AssetType::Commodity,
        AssetType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Land => "Land",
            AssetType::Art => "Art",
            AssetType::Carbon => "Carbon",
            AssetType::RealEstate => "RealEstate",
            AssetType::Commodity => "Commodity",
            AssetType::Other => "Other",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    /// 大文字小文字と区切り文字（`-`, `_`, 空白）を無視して解釈する。
    /// 例: "real-estate", "REAL_ESTATE", "RealEstate"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        AssetType::ALL
            .into_iter()
            .find(|t| t.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("不明な資産種別です: {s}"))
    }
}

// ---------------------------------------------------------------------------
// ネットワーク・メタデータプロバイダ
// ---------------------------------------------------------------------------

/// 接続先のSolanaクラスタ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Devnet => "devnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            "localnet" | "localhost" => Ok(Network::Localnet),
            other => Err(format!("不明なネットワークです: {other}")),
        }
    }
}

/// オフチェーンメタデータの保存先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProvider {
    Arweave,
    Ipfs,
    /// 開発用のインメモリストア
    #[default]
    Local,
}

impl FromStr for MetadataProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arweave" => Ok(MetadataProvider::Arweave),
            "ipfs" => Ok(MetadataProvider::Ipfs),
            "local" => Ok(MetadataProvider::Local),
            other => Err(format!("不明なメタデータプロバイダです: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// オフチェーンメタデータ
// ---------------------------------------------------------------------------

/// 資産のオフチェーンメタデータ（metadata_uriの参照先JSON）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub description: String,
    /// 画像URI
    pub image: String,
    #[serde(default)]
    pub external_url: String,
    pub attributes: Vec<MetadataAttribute>,
    pub properties: MetadataProperties,
}

/// メタデータ属性。valueは文字列または数値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

/// 属性値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<u64> for AttributeValue {
    fn from(n: u64) -> Self {
        AttributeValue::Number(n.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataProperties {
    pub files: Vec<MetadataFile>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    /// MIMEタイプ
    #[serde(rename = "type")]
    pub file_type: String,
}

// ---------------------------------------------------------------------------
// 残高・トランザクション結果
// ---------------------------------------------------------------------------

/// ウォレット残高（表示単位）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub sol: f64,
    pub usdc: f64,
    /// Base58 Mintアドレス → 残高
    pub tokens: BTreeMap<String, f64>,
}

/// UI向けのトランザクション結果。
/// 失敗時はsignatureが空文字列になり、errorにメッセージが入る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Base58エンコードされたトランザクション署名
    pub signature: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionResult {
    pub fn ok(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            signature: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}
