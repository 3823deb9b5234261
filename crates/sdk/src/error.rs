//! # SDK エラー型

/// SDKエラー型。
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// RPCノードがJSON-RPCエラーを返した
    #[error("Solana RPC エラー ({code}): {message}")]
    Rpc { code: i64, message: String },
    /// HTTP通信に失敗
    #[error("HTTP通信に失敗: {0}")]
    Http(String),
    /// シリアライズ/デシリアライズに失敗
    #[error("シリアライズに失敗: {0}")]
    Serialization(String),
    /// アカウントデータが不正（ディスクリミネータ不一致、所有プログラム不一致等）
    #[error("アカウントデータが不正です: {0}")]
    InvalidAccount(String),
    /// 資産アカウントが存在しない
    #[error("資産が見つかりません: {0}")]
    AssetNotFound(String),
    /// 不正な入力
    #[error("不正な入力: {0}")]
    InvalidInput(String),
    /// メタデータのアップロード・取得に失敗
    #[error("メタデータ処理に失敗: {0}")]
    Metadata(String),
    /// 設定エラー
    #[error("設定エラー: {0}")]
    Config(String),
    /// トランザクションの確定待ちがタイムアウト
    #[error("トランザクションの確定がタイムアウトしました: {0}")]
    Timeout(String),
    /// トランザクションがオンチェーンで失敗
    #[error("トランザクションが失敗しました: {0}")]
    TransactionFailed(String),
}

/// ノードが一時的に応答できないことを示すJSON-RPCエラーコード。
const TRANSIENT_RPC_CODES: &[i64] = &[
    -32004, // Block not available
    -32005, // Node is unhealthy / behind
    -32014, // Block status not yet available
];

impl SdkError {
    /// リトライで回復が見込めるエラーかどうか。
    pub fn is_transient(&self) -> bool {
        match self {
            SdkError::Http(_) => true,
            SdkError::Rpc { code, .. } => TRANSIENT_RPC_CODES.contains(code),
            _ => false,
        }
    }
}
