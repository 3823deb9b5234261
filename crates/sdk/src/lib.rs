//! # RWA Portal クライアントSDK
//!
//! rwa-tokenプログラムを操作するためのクライアントライブラリ。
//!
//! ## 構成
//! - `constants`: プログラムID、USDC Mint、ネットワーク設定
//! - `pda`: 資産・Mint・関連トークンアカウントのアドレス導出
//! - `instruction`: プログラム命令の構築（Anchor互換のディスクリミネータ + Borsh）
//! - `state`: 資産アカウントのデコードと表示用ビュー
//! - `math`: 価格・時価総額・単位変換・表示フォーマット
//! - `retry`: 指数バックオフ付きリトライ
//! - `rpc`: Solana JSON-RPCクライアント
//! - `client`: 上記を組み合わせた高水準クライアント `RwaClient`
//! - `metadata`: オフチェーンメタデータ（Arweave / IPFS / ローカル）
//! - `config`: 環境変数からの設定読み込み

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod instruction;
pub mod math;
pub mod metadata;
pub mod pda;
pub mod retry;
pub mod rpc;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{transaction_result, CreateAssetParams, RwaClient, TransferTokensParams};
pub use config::SdkConfig;
pub use error::SdkError;
pub use retry::RetryPolicy;
pub use rpc::RpcClient;
pub use state::{AssetAccount, AssetView};

pub use rwa_types;
