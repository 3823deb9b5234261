//! # 高水準クライアント
//!
//! 命令の構築、ブロックハッシュ取得、署名、送信、確定待ちをまとめて行う。
//! RPC呼び出しはすべて `RetryPolicy` に従ってリトライする（一時的なエラーのみ）。
//! トランザクションは1回だけ署名し、送信のリトライでは同じ署名済みトランザクションを再送する。

use std::future::Future;
use std::time::Duration;

use rwa_types::{AssetType, Network, TransactionResult, WalletBalance};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::config::SdkConfig;
use crate::constants::{
    network_config, MAX_DESCRIPTION_LEN, MAX_METADATA_URI_LEN, MAX_NAME_LEN, PROGRAM_ID,
    TOKEN_DECIMALS,
};
use crate::error::SdkError;
use crate::instruction;
use crate::math::{self, PurchaseQuote};
use crate::metadata::fetch_metadata_by_uri;
use crate::pda::{associated_token_address, derive_asset_pda_with_program, derive_mint_pda_with_program};
use crate::retry::{retry_when, RetryPolicy};
use crate::rpc::{Memcmp, RpcClient};
use crate::state::{asset_discriminator, AssetAccount, AssetView};

/// 確定待ちの既定タイムアウト
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// パラメータ
// ---------------------------------------------------------------------------

/// 資産登録のパラメータ。金額・数量は最小単位（6桁）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAssetParams {
    pub name: String,
    pub description: String,
    pub valuation: u64,
    pub asset_type: AssetType,
    pub metadata_uri: String,
    pub total_supply: u64,
}

impl CreateAssetParams {
    /// オンチェーンの入力検査と同じ条件を送信前に確認する。
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.name.is_empty() {
            return Err(SdkError::InvalidInput("資産名が空です".to_string()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(SdkError::InvalidInput(format!(
                "資産名は{MAX_NAME_LEN}バイト以下である必要があります: {} bytes",
                self.name.len()
            )));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(SdkError::InvalidInput(format!(
                "説明は{MAX_DESCRIPTION_LEN}バイト以下である必要があります"
            )));
        }
        if self.metadata_uri.len() > MAX_METADATA_URI_LEN {
            return Err(SdkError::InvalidInput(format!(
                "メタデータURIは{MAX_METADATA_URI_LEN}バイト以下である必要があります"
            )));
        }
        if self.total_supply == 0 {
            return Err(SdkError::InvalidInput("発行上限は1以上である必要があります".to_string()));
        }
        if self.valuation == 0 {
            return Err(SdkError::InvalidInput("評価額は1以上である必要があります".to_string()));
        }
        Ok(())
    }
}

/// トークンアカウント間の送金パラメータ。送金元の権限者はpayer。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTokensParams {
    pub from_token_account: Pubkey,
    pub to_token_account: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// 送信結果をUI向けの `TransactionResult` に変換する。
pub fn transaction_result(result: &Result<Signature, SdkError>) -> TransactionResult {
    match result {
        Ok(signature) => TransactionResult::ok(signature.to_string()),
        Err(e) => TransactionResult::failed(e.to_string()),
    }
}

fn require_positive(amount: u64, what: &str) -> Result<(), SdkError> {
    if amount == 0 {
        return Err(SdkError::InvalidInput(format!("{what}は1以上である必要があります")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// クライアント
// ---------------------------------------------------------------------------

/// rwa-tokenプログラムのクライアント。
pub struct RwaClient {
    rpc: RpcClient,
    payer: Keypair,
    network: Network,
    usdc_mint: Pubkey,
    program_id: Pubkey,
    retry: RetryPolicy,
    confirm_timeout: Duration,
    http: reqwest::Client,
}

impl RwaClient {
    pub fn new(rpc_url: impl Into<String>, payer: Keypair, network: Network) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            payer,
            network,
            usdc_mint: network_config(network).usdc_mint,
            program_id: PROGRAM_ID,
            retry: RetryPolicy::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    /// 設定から構築する。署名鍵が未設定の場合はエラー。
    pub fn from_config(config: SdkConfig) -> Result<Self, SdkError> {
        let payer = config.keypair.ok_or_else(|| {
            SdkError::Config("RWA_KEYPAIRまたはRWA_KEYPAIR_PATHが設定されていません".to_string())
        })?;
        Ok(Self::new(config.rpc_url, payer, config.network).with_retry_policy(config.retry))
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_usdc_mint(mut self, usdc_mint: Pubkey) -> Self {
        self.usdc_mint = usdc_mint;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn with_rpc(mut self, rpc: RpcClient) -> Self {
        self.rpc = rpc;
        self
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn usdc_mint(&self) -> &Pubkey {
        &self.usdc_mint
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// 資産PDA。資産名が32バイトを超える場合は `InvalidInput`。
    pub fn asset_address(&self, owner: &Pubkey, name: &str) -> Result<Pubkey, SdkError> {
        Ok(derive_asset_pda_with_program(owner, name, &self.program_id)?.0)
    }

    /// 分割トークンMint PDA
    pub fn mint_address(&self, asset: &Pubkey) -> Pubkey {
        derive_mint_pda_with_program(asset, &self.program_id).0
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, SdkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SdkError>>,
    {
        retry_when(&self.retry, op, SdkError::is_transient).await
    }

    /// 命令を1トランザクションにまとめて署名・送信し、確定を待つ。
    ///
    /// 送信が一時的なエラーでリトライ上限に達した場合、そのトランザクションが
    /// 既にクラスタに届いていれば確定待ちへ進み、届いていなければエラーを返す。
    /// 別のブロックハッシュで署名し直すことはしない。
    pub async fn send_instructions(&self, instructions: &[Instruction]) -> Result<Signature, SdkError> {
        let rpc = &self.rpc;
        let blockhash = self
            .with_retry(move || async move { rpc.get_latest_blockhash().await })
            .await?;

        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &[&self.payer],
            blockhash,
        );
        let local_signature = tx
            .signatures
            .first()
            .copied()
            .ok_or_else(|| SdkError::Serialization("トランザクションに署名がありません".to_string()))?;
        let tx = &tx;

        let signature = match self
            .with_retry(move || async move { rpc.send_transaction(tx).await })
            .await
        {
            Ok(signature) => signature,
            Err(e) => {
                if !e.is_transient() || !self.signature_known(&local_signature).await {
                    return Err(e);
                }
                tracing::warn!(
                    signature = %local_signature,
                    error = %e,
                    "送信応答は失敗しましたが、トランザクションは受理されています"
                );
                local_signature
            }
        };

        tracing::info!(%signature, "トランザクションを送信しました。確定を待機します");
        self.rpc.confirm_transaction(&signature, self.confirm_timeout).await?;
        Ok(signature)
    }

    /// クラスタが署名を認識しているかどうか。問い合わせに失敗した場合はfalse。
    async fn signature_known(&self, signature: &Signature) -> bool {
        match self.rpc.get_signature_statuses(std::slice::from_ref(signature)).await {
            Ok(statuses) => matches!(statuses.first(), Some(Some(_))),
            Err(e) => {
                tracing::warn!(%signature, error = %e, "署名ステータスの取得に失敗しました");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // 書き込み操作
    // -----------------------------------------------------------------------

    /// 資産を登録する。資産PDAは `asset_address(payer, name)`。
    pub async fn create_asset(&self, params: &CreateAssetParams) -> Result<Signature, SdkError> {
        params.validate()?;
        let owner = self.payer();
        let asset = self.asset_address(&owner, &params.name)?;

        let ix = instruction::initialize_asset(
            &self.program_id,
            &owner,
            &asset,
            &params.name,
            &params.description,
            params.valuation,
            params.asset_type,
            &params.metadata_uri,
            params.total_supply,
        )?;

        let signature = self.send_instructions(&[ix]).await?;
        tracing::info!(%asset, name = %params.name, %signature, "資産を登録しました");
        Ok(signature)
    }

    /// 資産所有者として分割トークンを自身の関連トークンアカウントへミントする。
    pub async fn mint_tokens(&self, asset: &Pubkey, amount: u64) -> Result<Signature, SdkError> {
        require_positive(amount, "ミント数量")?;
        self.require_asset(asset).await?;

        let ix = instruction::mint_fractional_tokens(&self.program_id, asset, &self.payer(), amount)?;
        let signature = self.send_instructions(&[ix]).await?;
        tracing::info!(%asset, amount, %signature, "分割トークンをミントしました");
        Ok(signature)
    }

    /// USDCで分割トークンを購入する。
    /// `usdc_amount` を省略した場合は見積もり額をそのまま支払う。
    pub async fn buy_fraction(
        &self,
        asset: &Pubkey,
        tokens: u64,
        usdc_amount: Option<u64>,
    ) -> Result<Signature, SdkError> {
        let account = self.require_asset(asset).await?;
        let instructions = self.buy_fraction_instructions(asset, &account, tokens, usdc_amount)?;
        let signature = self.send_instructions(&instructions).await?;
        tracing::info!(%asset, tokens, %signature, "分割トークンを購入しました");
        Ok(signature)
    }

    /// 購入トランザクションの命令列を組み立てる。
    /// 購入者の分割トークンATAを冪等に作成してから `buy_fraction` を実行する。
    pub fn buy_fraction_instructions(
        &self,
        asset: &Pubkey,
        account: &AssetAccount,
        tokens: u64,
        usdc_amount: Option<u64>,
    ) -> Result<Vec<Instruction>, SdkError> {
        require_positive(tokens, "購入数量")?;
        if !account.is_active {
            return Err(SdkError::InvalidInput(format!("資産が無効化されています: {asset}")));
        }
        let quote = self.quote_purchase(account, tokens)?;
        let usdc_amount = usdc_amount.unwrap_or(quote.usdc_amount);
        if usdc_amount < quote.min_usdc_amount {
            return Err(SdkError::InvalidInput(format!(
                "支払額が最低支払額を下回っています: {usdc_amount} < {}",
                quote.min_usdc_amount
            )));
        }

        let buyer = self.payer();
        let mint = self.mint_address(asset);
        Ok(vec![
            instruction::create_associated_token_account_idempotent(&buyer, &buyer, &mint),
            instruction::buy_fraction(
                &self.program_id,
                asset,
                &account.owner,
                &buyer,
                &self.usdc_mint,
                usdc_amount,
                tokens,
            )?,
        ])
    }

    /// 購入見積もり
    pub fn quote_purchase(&self, account: &AssetAccount, tokens: u64) -> Result<PurchaseQuote, SdkError> {
        math::quote_purchase(account.valuation, account.total_supply, tokens)
    }

    /// トークンアカウント間で分割トークンを送金する。
    pub async fn transfer_tokens(&self, params: &TransferTokensParams) -> Result<Signature, SdkError> {
        require_positive(params.amount, "送金数量")?;
        let ix = instruction::transfer_fractional_tokens(
            &self.program_id,
            &params.from_token_account,
            &params.to_token_account,
            &params.mint,
            &self.payer(),
            params.amount,
        )?;
        let signature = self.send_instructions(&[ix]).await?;
        tracing::info!(mint = %params.mint, amount = params.amount, %signature, "分割トークンを送金しました");
        Ok(signature)
    }

    /// payerのATAから受取人のATAへ送金する。受取人のATAは冪等に作成する。
    pub async fn transfer_to_wallet(
        &self,
        asset: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<Signature, SdkError> {
        let instructions = self.transfer_to_wallet_instructions(asset, recipient, amount)?;
        let signature = self.send_instructions(&instructions).await?;
        tracing::info!(%asset, %recipient, amount, %signature, "分割トークンを送金しました");
        Ok(signature)
    }

    /// ウォレット宛て送金の命令列を組み立てる。
    pub fn transfer_to_wallet_instructions(
        &self,
        asset: &Pubkey,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<Vec<Instruction>, SdkError> {
        require_positive(amount, "送金数量")?;
        let payer = self.payer();
        let mint = self.mint_address(asset);
        Ok(vec![
            instruction::create_associated_token_account_idempotent(&payer, recipient, &mint),
            instruction::transfer_fractional_tokens(
                &self.program_id,
                &associated_token_address(&payer, &mint),
                &associated_token_address(recipient, &mint),
                &mint,
                &payer,
                amount,
            )?,
        ])
    }

    /// 保有する分割トークンをバーンして償還する。
    pub async fn redeem(&self, asset: &Pubkey, token_amount: u64) -> Result<Signature, SdkError> {
        require_positive(token_amount, "償還数量")?;
        self.require_asset(asset).await?;

        let ix = instruction::redeem(&self.program_id, asset, &self.payer(), token_amount)?;
        let signature = self.send_instructions(&[ix]).await?;
        tracing::info!(%asset, token_amount, %signature, "分割トークンを償還しました");
        Ok(signature)
    }

    /// 資産の有効/無効を切り替える（資産所有者のみ）。
    pub async fn set_asset_active(&self, asset: &Pubkey, is_active: bool) -> Result<Signature, SdkError> {
        let ix = instruction::set_asset_active(&self.program_id, asset, &self.payer(), is_active)?;
        let signature = self.send_instructions(&[ix]).await?;
        tracing::info!(%asset, is_active, %signature, "資産の状態を変更しました");
        Ok(signature)
    }

    // -----------------------------------------------------------------------
    // 読み取り操作
    // -----------------------------------------------------------------------

    /// 資産アカウントを取得する。存在しない場合は `None`。
    /// 別プログラムが所有するアカウントは `InvalidAccount`。
    pub async fn get_asset(&self, asset: &Pubkey) -> Result<Option<AssetAccount>, SdkError> {
        let rpc = &self.rpc;
        let Some(account) = self
            .with_retry(move || async move { rpc.get_account_info(asset).await })
            .await?
        else {
            return Ok(None);
        };

        if account.owner != self.program_id {
            return Err(SdkError::InvalidAccount(format!(
                "{asset} はrwa-tokenプログラムのアカウントではありません (owner: {})",
                account.owner
            )));
        }
        AssetAccount::decode(&account.data).map(Some)
    }

    async fn require_asset(&self, asset: &Pubkey) -> Result<AssetAccount, SdkError> {
        self.get_asset(asset)
            .await?
            .ok_or_else(|| SdkError::AssetNotFound(asset.to_string()))
    }

    /// 資産を表示用ビューとして取得する。メタデータの取得は失敗しても続行する。
    pub async fn get_asset_with_metadata(&self, asset: &Pubkey) -> Result<Option<AssetView>, SdkError> {
        let Some(account) = self.get_asset(asset).await? else {
            return Ok(None);
        };
        let metadata = if account.metadata_uri.is_empty() {
            None
        } else {
            fetch_metadata_by_uri(&self.http, &account.metadata_uri).await
        };
        Ok(Some(AssetView::new(asset, &self.program_id, &account, metadata)))
    }

    /// プログラムが所有する全資産を取得する。デコードできないアカウントは警告して読み飛ばす。
    pub async fn get_all_assets(&self) -> Result<Vec<AssetView>, SdkError> {
        let rpc = &self.rpc;
        let program_id = &self.program_id;
        let filters = [Memcmp::new(0, asset_discriminator().to_vec())];
        let filters = &filters;

        let accounts = self
            .with_retry(move || async move { rpc.get_program_accounts(program_id, filters).await })
            .await?;

        let mut assets = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match AssetAccount::decode(&account.data) {
                Ok(decoded) => assets.push(AssetView::new(&address, &self.program_id, &decoded, None)),
                Err(e) => {
                    tracing::warn!(%address, error = %e, "資産アカウントのデコードに失敗。スキップします");
                }
            }
        }
        Ok(assets)
    }

    /// SOL・USDC残高と、指定資産の分割トークン残高を取得する。
    /// トークンアカウントが存在しない場合は0。
    pub async fn get_wallet_balance(&self, owner: &Pubkey, assets: &[Pubkey]) -> Result<WalletBalance, SdkError> {
        let rpc = &self.rpc;
        let lamports = self
            .with_retry(move || async move { rpc.get_balance(owner).await })
            .await?;
        let usdc = self.token_balance(owner, &self.usdc_mint).await?;

        let mut balance = WalletBalance {
            sol: math::lamports_to_sol(lamports),
            usdc,
            ..Default::default()
        };
        for asset in assets {
            let mint = self.mint_address(asset);
            let amount = self.token_balance(owner, &mint).await?;
            balance.tokens.insert(mint.to_string(), amount);
        }
        Ok(balance)
    }

    /// 資産の分割トークン残高（表示単位）
    pub async fn get_token_balance_for_asset(&self, owner: &Pubkey, asset: &Pubkey) -> Result<f64, SdkError> {
        let mint = self.mint_address(asset);
        self.token_balance(owner, &mint).await
    }

    async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<f64, SdkError> {
        let rpc = &self.rpc;
        let ata = associated_token_address(owner, mint);
        let ata = &ata;
        let amount = self
            .with_retry(move || async move { rpc.get_token_account_balance(ata).await })
            .await?
            .unwrap_or(0);
        Ok(math::token_amount_to_number(amount, TOKEN_DECIMALS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, USDC_MINT, USDC_MINT_DEVNET};
    use crate::pda::derive_mint_pda;
    use crate::test_helpers::{account_json, context, rpc_error, rpc_result, sample_asset, spawn_rpc_server};
    use serde_json::{json, Value};
    use solana_sdk::hash::Hash;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn fast_client(url: String, payer: Keypair) -> RwaClient {
        RwaClient::new(url.clone(), payer, Network::Localnet)
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)))
            .with_rpc(RpcClient::new(url).with_poll_interval(Duration::from_millis(1)))
            .with_confirm_timeout(Duration::from_secs(2))
    }

    fn confirmed_status() -> Value {
        context(json!([{
            "slot": 5,
            "confirmations": null,
            "err": null,
            "confirmationStatus": "confirmed"
        }]))
    }

    fn create_params() -> CreateAssetParams {
        CreateAssetParams {
            name: "Tokyo Office".to_string(),
            description: "Grade A office".to_string(),
            valuation: 1_500_000 * 1_000_000,
            asset_type: AssetType::RealEstate,
            metadata_uri: "https://arweave.net/abc".to_string(),
            total_supply: 1_000_000 * 1_000_000,
        }
    }

    #[test]
    fn test_create_params_validation() {
        assert!(create_params().validate().is_ok());

        let mut p = create_params();
        p.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(p.validate(), Err(SdkError::InvalidInput(_))));

        let mut p = create_params();
        p.name = String::new();
        assert!(p.validate().is_err());

        let mut p = create_params();
        p.description = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(p.validate().is_err());

        let mut p = create_params();
        p.metadata_uri = "u".repeat(MAX_METADATA_URI_LEN + 1);
        assert!(p.validate().is_err());

        let mut p = create_params();
        p.total_supply = 0;
        assert!(p.validate().is_err());

        let mut p = create_params();
        p.valuation = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_transaction_result() {
        let ok = transaction_result(&Ok(Signature::default()));
        assert!(ok.success);
        assert_eq!(ok.signature, Signature::default().to_string());

        let failed = transaction_result(&Err(SdkError::AssetNotFound("x".to_string())));
        assert!(!failed.success);
        assert!(failed.signature.is_empty());
        assert!(failed.error.unwrap().contains("資産が見つかりません"));
    }

    #[tokio::test]
    async fn test_create_asset_sends_and_confirms() {
        let signature = Signature::from([7u8; 64]);
        let methods = Arc::new(Mutex::new(Vec::<String>::new()));
        let methods_clone = methods.clone();

        let url = spawn_rpc_server(move |method, _| {
            methods_clone.lock().unwrap().push(method.to_string());
            match method {
                "getLatestBlockhash" => rpc_result(context(json!({
                    "blockhash": Hash::new_unique().to_string(),
                    "lastValidBlockHeight": 1
                }))),
                "sendTransaction" => rpc_result(json!(signature.to_string())),
                "getSignatureStatuses" => rpc_result(confirmed_status()),
                other => panic!("unexpected method: {other}"),
            }
        })
        .await;

        let client = fast_client(url, Keypair::new());
        let result = client.create_asset(&create_params()).await.unwrap();
        assert_eq!(result, signature);
        assert_eq!(
            *methods.lock().unwrap(),
            vec!["getLatestBlockhash", "sendTransaction", "getSignatureStatuses"]
        );
    }

    #[tokio::test]
    async fn test_send_retries_transient_rpc_errors() {
        let blockhash_calls = Arc::new(AtomicU32::new(0));
        let calls = blockhash_calls.clone();
        let url = spawn_rpc_server(move |method, _| match method {
            "getLatestBlockhash" => {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    rpc_error(-32005, "Node is behind by 42 slots")
                } else {
                    rpc_result(context(json!({
                        "blockhash": Hash::new_unique().to_string(),
                        "lastValidBlockHeight": 1
                    })))
                }
            }
            "sendTransaction" => rpc_result(json!(Signature::default().to_string())),
            "getSignatureStatuses" => rpc_result(confirmed_status()),
            other => panic!("unexpected method: {other}"),
        })
        .await;

        let client = fast_client(url, Keypair::new());
        let asset = Pubkey::new_unique();
        client.set_asset_active(&asset, false).await.unwrap();
        assert_eq!(blockhash_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_send_resends_same_signed_transaction() {
        let blockhash_calls = Arc::new(AtomicU32::new(0));
        let sent = Arc::new(Mutex::new(Vec::<String>::new()));
        let (blockhash_clone, sent_clone) = (blockhash_calls.clone(), sent.clone());
        let url = spawn_rpc_server(move |method, params| match method {
            "getLatestBlockhash" => {
                blockhash_clone.fetch_add(1, Ordering::SeqCst);
                rpc_result(context(json!({
                    "blockhash": Hash::new_unique().to_string(),
                    "lastValidBlockHeight": 1
                })))
            }
            "sendTransaction" => {
                let mut sent = sent_clone.lock().unwrap();
                sent.push(params[0].as_str().unwrap().to_string());
                if sent.len() == 1 {
                    // 転送済みだが応答だけ失敗したケース
                    rpc_error(-32005, "Node is behind by 42 slots")
                } else {
                    rpc_result(json!(Signature::default().to_string()))
                }
            }
            "getSignatureStatuses" => rpc_result(confirmed_status()),
            other => panic!("unexpected method: {other}"),
        })
        .await;

        let client = fast_client(url, Keypair::new());
        client.set_asset_active(&Pubkey::new_unique(), false).await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(blockhash_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_exhausted_uses_signature_status() {
        let send_calls = Arc::new(AtomicU32::new(0));
        let calls = send_calls.clone();
        let url = spawn_rpc_server(move |method, _| match method {
            "getLatestBlockhash" => rpc_result(context(json!({
                "blockhash": Hash::new_unique().to_string(),
                "lastValidBlockHeight": 1
            }))),
            "sendTransaction" => {
                calls.fetch_add(1, Ordering::SeqCst);
                rpc_error(-32005, "Node is unhealthy")
            }
            "getSignatureStatuses" => rpc_result(confirmed_status()),
            other => panic!("unexpected method: {other}"),
        })
        .await;

        // 応答はすべて失敗したが、クラスタは署名を認識している
        let client = fast_client(url, Keypair::new());
        let signature = client.set_asset_active(&Pubkey::new_unique(), true).await.unwrap();
        assert_ne!(signature, Signature::default());
        assert_eq!(send_calls.load(Ordering::SeqCst), 3);

        // 署名が未知ならエラーのまま返す
        let url = spawn_rpc_server(|method, _| match method {
            "getLatestBlockhash" => rpc_result(context(json!({
                "blockhash": Hash::new_unique().to_string(),
                "lastValidBlockHeight": 1
            }))),
            "sendTransaction" => rpc_error(-32005, "Node is unhealthy"),
            "getSignatureStatuses" => rpc_result(context(json!([null]))),
            other => panic!("unexpected method: {other}"),
        })
        .await;
        let client = fast_client(url, Keypair::new());
        let err = client.set_asset_active(&Pubkey::new_unique(), true).await.unwrap_err();
        assert!(matches!(err, SdkError::Rpc { code: -32005, .. }));
    }

    #[tokio::test]
    async fn test_create_asset_rejects_long_name_before_rpc() {
        let url = spawn_rpc_server(|method, _| panic!("unexpected method: {method}")).await;
        let client = fast_client(url, Keypair::new());
        let mut params = create_params();
        params.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            client.create_asset(&params).await,
            Err(SdkError::InvalidInput(_))
        ));
        assert!(matches!(
            client.asset_address(&client.payer(), &params.name),
            Err(SdkError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_send_does_not_retry_simulation_failure() {
        let send_calls = Arc::new(AtomicU32::new(0));
        let calls = send_calls.clone();
        let url = spawn_rpc_server(move |method, _| match method {
            "getLatestBlockhash" => rpc_result(context(json!({
                "blockhash": Hash::new_unique().to_string(),
                "lastValidBlockHeight": 1
            }))),
            "sendTransaction" => {
                calls.fetch_add(1, Ordering::SeqCst);
                rpc_error(-32002, "Transaction simulation failed")
            }
            other => panic!("unexpected method: {other}"),
        })
        .await;

        let client = fast_client(url, Keypair::new());
        let err = client.set_asset_active(&Pubkey::new_unique(), true).await.unwrap_err();
        assert!(matches!(err, SdkError::Rpc { code: -32002, .. }));
        assert_eq!(send_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_asset_missing_and_wrong_owner() {
        let missing = Pubkey::new_unique();
        let foreign = Pubkey::new_unique();
        let url = spawn_rpc_server(move |_, params| {
            if params[0] == missing.to_string() {
                rpc_result(context(Value::Null))
            } else {
                let data = sample_asset(Pubkey::new_unique()).encode().unwrap();
                rpc_result(context(account_json(&Pubkey::new_unique(), &data)))
            }
        })
        .await;

        let client = fast_client(url, Keypair::new());
        assert!(client.get_asset(&missing).await.unwrap().is_none());
        assert!(matches!(
            client.get_asset(&foreign).await,
            Err(SdkError::InvalidAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_mint_tokens_asset_not_found() {
        let url = spawn_rpc_server(|_, _| rpc_result(context(Value::Null))).await;
        let client = fast_client(url, Keypair::new());
        let err = client.mint_tokens(&Pubkey::new_unique(), 1_000_000).await.unwrap_err();
        assert!(matches!(err, SdkError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_asset_with_metadata_tolerates_unreachable_metadata() {
        let owner = Pubkey::new_unique();
        let mut asset = sample_asset(owner);
        asset.metadata_uri = "local://local_0_abcdefghi".to_string();
        let data = asset.encode().unwrap();
        let url = spawn_rpc_server(move |_, _| rpc_result(context(account_json(&PROGRAM_ID, &data)))).await;

        let client = fast_client(url, Keypair::new());
        let address = client.asset_address(&owner, &asset.name).unwrap();
        let view = client.get_asset_with_metadata(&address).await.unwrap().unwrap();
        assert_eq!(view.name, "Tokyo Office");
        assert!(view.metadata.is_none());
        assert!((view.token_price - 1.5).abs() < 1e-9);
        assert_eq!(view.mint, client.mint_address(&address).to_string());
    }

    #[tokio::test]
    async fn test_get_all_assets_skips_undecodable() {
        let good = sample_asset(Pubkey::new_unique()).encode().unwrap();
        let mut bad = asset_discriminator().to_vec();
        bad.extend_from_slice(&[1, 2, 3]);
        let good_key = Pubkey::new_unique();
        let bad_key = Pubkey::new_unique();

        let url = spawn_rpc_server(move |method, _| {
            assert_eq!(method, "getProgramAccounts");
            rpc_result(json!([
                {"pubkey": good_key.to_string(), "account": account_json(&PROGRAM_ID, &good)},
                {"pubkey": bad_key.to_string(), "account": account_json(&PROGRAM_ID, &bad)},
            ]))
        })
        .await;

        let client = fast_client(url, Keypair::new());
        let assets = client.get_all_assets().await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].address, good_key.to_string());
    }

    #[tokio::test]
    async fn test_get_wallet_balance() {
        let owner = Pubkey::new_unique();
        let asset = Pubkey::new_unique();
        let url = spawn_rpc_server(move |method, _| match method {
            "getBalance" => rpc_result(context(json!(2_500_000_000u64))),
            // USDC・分割トークンともにアカウント未作成
            "getTokenAccountBalance" => rpc_error(-32602, "Invalid param: could not find account"),
            other => panic!("unexpected method: {other}"),
        })
        .await;

        let client = fast_client(url, Keypair::new());
        let balance = client.get_wallet_balance(&owner, &[asset]).await.unwrap();
        assert_eq!(balance.sol, 2.5);
        assert_eq!(balance.usdc, 0.0);
        assert_eq!(balance.tokens.get(&client.mint_address(&asset).to_string()), Some(&0.0));
    }

    #[test]
    fn test_buy_fraction_instructions() {
        let payer = Keypair::new();
        let buyer = payer.pubkey();
        let client = RwaClient::new("http://127.0.0.1:8899", payer, Network::Devnet);
        let owner = Pubkey::new_unique();
        let asset = client.asset_address(&owner, "Tokyo Office").unwrap();
        let account = sample_asset(owner);

        // 1トークン = 1.5 USDC
        let ixs = client
            .buy_fraction_instructions(&asset, &account, 2_000_000, None)
            .unwrap();
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ixs[1].program_id, PROGRAM_ID);
        assert_eq!(ixs[1].accounts[3].pubkey, buyer);
        assert_eq!(
            ixs[1].accounts[6].pubkey,
            associated_token_address(&owner, client.usdc_mint())
        );
        // 見積もり額 3 USDC がそのまま渡る
        assert_eq!(&ixs[1].data[8..16], &3_000_000u64.to_le_bytes());

        // 最低支払額を下回る
        assert!(client
            .buy_fraction_instructions(&asset, &account, 2_000_000, Some(2_000_000))
            .is_err());

        let mut inactive = account.clone();
        inactive.is_active = false;
        assert!(client
            .buy_fraction_instructions(&asset, &inactive, 2_000_000, None)
            .is_err());
    }

    #[test]
    fn test_buy_fraction_uses_network_usdc_mint() {
        let owner = Pubkey::new_unique();
        let account = sample_asset(owner);
        for (network, usdc) in [
            (Network::Mainnet, USDC_MINT),
            (Network::Devnet, USDC_MINT_DEVNET),
            (Network::Localnet, USDC_MINT_DEVNET),
        ] {
            let client = RwaClient::new("http://127.0.0.1:8899", Keypair::new(), network);
            let asset = client.asset_address(&owner, &account.name).unwrap();
            let ixs = client
                .buy_fraction_instructions(&asset, &account, 1_000_000, None)
                .unwrap();
            assert_eq!(ixs[1].accounts[2].pubkey, usdc);
            assert_eq!(
                ixs[1].accounts[4].pubkey,
                associated_token_address(&client.payer(), &usdc)
            );
        }
    }

    #[test]
    fn test_transfer_to_wallet_instructions() {
        let payer = Keypair::new();
        let sender = payer.pubkey();
        let client = RwaClient::new("http://127.0.0.1:8899", payer, Network::Devnet);
        let asset = client.asset_address(&Pubkey::new_unique(), "Tokyo Office").unwrap();
        let mint = client.mint_address(&asset);
        let recipient = Pubkey::new_unique();

        let ixs = client
            .transfer_to_wallet_instructions(&asset, &recipient, 250_000)
            .unwrap();
        assert_eq!(ixs.len(), 2);

        // 受取人のATAを冪等に作成（payerが手数料を負担）
        assert_eq!(ixs[0].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ixs[0].data, vec![1]);
        assert_eq!(ixs[0].accounts[0].pubkey, sender);
        assert_eq!(ixs[0].accounts[1].pubkey, associated_token_address(&recipient, &mint));
        assert_eq!(ixs[0].accounts[2].pubkey, recipient);

        // payerのATA → 受取人のATA
        assert_eq!(ixs[1].program_id, PROGRAM_ID);
        assert_eq!(ixs[1].accounts[0].pubkey, associated_token_address(&sender, &mint));
        assert_eq!(ixs[1].accounts[1].pubkey, associated_token_address(&recipient, &mint));
        assert_eq!(ixs[1].accounts[2].pubkey, mint);
        assert_eq!(ixs[1].accounts[3].pubkey, sender);
        assert_eq!(&ixs[1].data[8..16], &250_000u64.to_le_bytes());

        assert!(matches!(
            client.transfer_to_wallet_instructions(&asset, &recipient, 0),
            Err(SdkError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_get_token_balance_for_asset() {
        let owner = Pubkey::new_unique();
        let asset = Pubkey::new_unique();
        let (mint, _) = derive_mint_pda(&asset);
        let expected_ata = associated_token_address(&owner, &mint);

        let url = spawn_rpc_server(move |method, params| {
            assert_eq!(method, "getTokenAccountBalance");
            assert_eq!(params[0], expected_ata.to_string());
            rpc_result(context(json!({
                "amount": "2500000",
                "decimals": 6,
                "uiAmount": 2.5,
                "uiAmountString": "2.5"
            })))
        })
        .await;

        let client = fast_client(url, Keypair::new());
        assert_eq!(client.get_token_balance_for_asset(&owner, &asset).await.unwrap(), 2.5);
    }

    #[test]
    fn test_from_config_requires_keypair() {
        let config = SdkConfig::from_lookup(|_| None).unwrap();
        assert!(matches!(RwaClient::from_config(config), Err(SdkError::Config(_))));
    }
}
