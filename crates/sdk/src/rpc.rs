//! # Solana JSON-RPC クライアント
//!
//! reqwestでJSON-RPC 2.0を直接呼び出す。
//! レスポンスの `error` オブジェクトは `SdkError::Rpc` に、通信失敗は `SdkError::Http` に変換する。

use std::str::FromStr;
use std::time::{Duration, Instant};

use base58::ToBase58;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::constants::{COMMITMENT, PREFLIGHT_COMMITMENT};
use crate::error::SdkError;

/// アカウントが存在しない場合にgetTokenAccountBalanceが返すエラーコード
const INVALID_PARAMS_CODE: i64 = -32602;

fn b64() -> base64::engine::general_purpose::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

// ---------------------------------------------------------------------------
// レスポンス型
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Deserialize)]
struct TokenAmountValue {
    amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// [base64データ, "base64"]
    data: (String, String),
    #[serde(default)]
    executable: bool,
}

#[derive(Deserialize)]
struct KeyedUiAccount {
    pubkey: String,
    account: UiAccount,
}

/// getSignatureStatusesの1要素。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    /// トランザクションエラー（成功時はnull）
    pub err: Option<Value>,
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// 指定コミットメントに到達しているかどうか。
    pub fn reached(&self, commitment: &str) -> bool {
        let current = self
            .confirmation_status
            .as_deref()
            .map(commitment_rank)
            .unwrap_or(0);
        current >= commitment_rank(commitment)
    }
}

fn commitment_rank(commitment: &str) -> u8 {
    match commitment {
        "processed" => 1,
        "confirmed" => 2,
        "finalized" => 3,
        _ => 0,
    }
}

/// デコード済みのアカウント情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub lamports: u64,
    /// 所有プログラム
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

impl TryFrom<UiAccount> for AccountData {
    type Error = SdkError;

    fn try_from(account: UiAccount) -> Result<Self, Self::Error> {
        let (encoded, encoding) = account.data;
        if encoding != "base64" {
            return Err(SdkError::Serialization(format!(
                "未対応のアカウントデータエンコーディング: {encoding}"
            )));
        }
        let data = b64()
            .decode(encoded)
            .map_err(|e| SdkError::Serialization(format!("アカウントデータのBase64デコードに失敗: {e}")))?;
        Ok(Self {
            lamports: account.lamports,
            owner: parse_pubkey(&account.owner)?,
            data,
            executable: account.executable,
        })
    }
}

/// getProgramAccountsのmemcmpフィルタ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memcmp {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl Memcmp {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "memcmp": {
                "offset": self.offset,
                "bytes": self.bytes.to_base58(),
            }
        })
    }
}

fn parse_pubkey(s: &str) -> Result<Pubkey, SdkError> {
    Pubkey::from_str(s).map_err(|e| SdkError::Serialization(format!("不正な公開鍵 {s}: {e}")))
}

// ---------------------------------------------------------------------------
// クライアント
// ---------------------------------------------------------------------------

/// Solana JSON-RPCクライアント。
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    commitment: String,
    poll_interval: Duration,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_http_client(url, reqwest::Client::new())
    }

    pub fn with_http_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
            commitment: COMMITMENT.to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }

    /// 確定待ちのポーリング間隔を変更する。
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> &str {
        &self.commitment
    }

    /// JSON-RPCメソッドを呼び出し、`result` をデシリアライズして返す。
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SdkError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, url = %self.url, "RPC呼び出し");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Http(format!("RPC送信失敗 ({method}): {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            SdkError::Http(format!("RPCレスポンスのパースに失敗 ({method}, HTTP {status}): {e}"))
        })?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(SdkError::Rpc { code, message });
        }

        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| SdkError::Serialization(format!("RPCレスポンスにresultがありません ({method})")))?;

        serde_json::from_value(result)
            .map_err(|e| SdkError::Serialization(format!("RPC結果のデシリアライズに失敗 ({method}): {e}")))
    }

    /// 最新のブロックハッシュを取得する。
    pub async fn get_latest_blockhash(&self) -> Result<Hash, SdkError> {
        let result: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;
        Hash::from_str(&result.value.blockhash)
            .map_err(|e| SdkError::Serialization(format!("不正なブロックハッシュ: {e}")))
    }

    /// 署名済みトランザクションを送信し、署名を返す。
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, SdkError> {
        let tx_bytes = bincode::serialize(tx)
            .map_err(|e| SdkError::Serialization(format!("トランザクションのシリアライズに失敗: {e}")))?;
        let tx_b64 = b64().encode(&tx_bytes);

        let signature: String = self
            .call(
                "sendTransaction",
                json!([tx_b64, {
                    "encoding": "base64",
                    "preflightCommitment": PREFLIGHT_COMMITMENT,
                }]),
            )
            .await?;

        Signature::from_str(&signature)
            .map_err(|e| SdkError::Serialization(format!("不正な署名 {signature}: {e}")))
    }

    /// 署名のステータスを取得する。未知の署名は `None`。
    pub async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, SdkError> {
        let sigs: Vec<String> = signatures.iter().map(|s| s.to_string()).collect();
        let result: WithContext<Vec<Option<SignatureStatus>>> = self
            .call("getSignatureStatuses", json!([sigs]))
            .await?;
        Ok(result.value)
    }

    /// トランザクションがコミットメントに到達するまでポーリングする。
    ///
    /// トランザクションエラーは `TransactionFailed`、期限切れは `Timeout`。
    /// ポーリング中の一時的なRPCエラーは無視して待ち続ける。
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<(), SdkError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.get_signature_statuses(std::slice::from_ref(signature)).await {
                Ok(statuses) => {
                    if let Some(Some(status)) = statuses.into_iter().next() {
                        if let Some(err) = status.err {
                            return Err(SdkError::TransactionFailed(format!("{signature}: {err}")));
                        }
                        if status.reached(&self.commitment) {
                            tracing::debug!(%signature, slot = status.slot, "トランザクション確定");
                            return Ok(());
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(%signature, error = %e, "ステータス取得に失敗。ポーリングを継続します");
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(SdkError::Timeout(signature.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// アカウント情報を取得する。存在しない場合は `None`。
    pub async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountData>, SdkError> {
        let result: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment,
                }]),
            )
            .await?;
        result.value.map(AccountData::try_from).transpose()
    }

    /// SOL残高（lamports）を取得する。
    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64, SdkError> {
        let result: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(result.value)
    }

    /// トークンアカウントの残高（最小単位）を取得する。アカウントが存在しない場合は `None`。
    pub async fn get_token_account_balance(&self, address: &Pubkey) -> Result<Option<u64>, SdkError> {
        let result: Result<WithContext<TokenAmountValue>, SdkError> = self
            .call(
                "getTokenAccountBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await;

        match result {
            Ok(r) => r
                .value
                .amount
                .parse::<u64>()
                .map(Some)
                .map_err(|e| SdkError::Serialization(format!("不正なトークン残高: {e}"))),
            Err(SdkError::Rpc { code, .. }) if code == INVALID_PARAMS_CODE => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// プログラムが所有するアカウントを取得する。
    pub async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[Memcmp],
    ) -> Result<Vec<(Pubkey, AccountData)>, SdkError> {
        let filters: Vec<Value> = filters.iter().map(Memcmp::to_json).collect();
        let accounts: Vec<KeyedUiAccount> = self
            .call(
                "getProgramAccounts",
                json!([program_id.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment,
                    "filters": filters,
                }]),
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| Ok((parse_pubkey(&keyed.pubkey)?, AccountData::try_from(keyed.account)?)))
            .collect()
    }
}
