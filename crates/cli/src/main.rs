//! # rwa-cli
//!
//! rwa-tokenプログラムを操作するコマンドラインツール。
//! 接続先・署名鍵は環境変数（`RWA_NETWORK`, `RWA_RPC_URL`, `RWA_KEYPAIR` 等）から読み込む。
//! 結果はすべて整形済みJSONで標準出力に出力する。
//!
//! 金額・数量の引数は表示単位（USDC・分割トークンとも小数6桁まで）の10進数で指定する。

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use rwa_sdk::constants::TOKEN_DECIMALS;
use rwa_sdk::math::parse_token_amount;
use rwa_sdk::metadata::{create_asset_metadata, create_metadata_service, validate_metadata};
use rwa_sdk::pda::{derive_asset_pda, derive_mint_pda};
use rwa_sdk::{transaction_result, CreateAssetParams, RwaClient, SdkConfig, SdkError};
use rwa_types::{AssetType, AttributeValue, MetadataAttribute, MetadataProvider};
use serde::Serialize;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;

#[derive(Parser)]
#[command(name = "rwa-cli", version, about = "RWA Portal: 実物資産のトークン化・分割所有")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 資産を登録する（payerが所有者になる）
    CreateAsset {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// 評価額（USDC）
        #[arg(long, value_parser = parse_amount)]
        valuation: u64,
        /// 資産種別（land, art, carbon, real-estate, commodity, other）
        #[arg(long = "type")]
        asset_type: AssetType,
        #[arg(long, default_value = "")]
        metadata_uri: String,
        /// 発行上限（トークン）
        #[arg(long, value_parser = parse_amount)]
        supply: u64,
    },
    /// 分割トークンを自身にミントする（資産所有者のみ）
    Mint {
        asset: Pubkey,
        #[arg(long, value_parser = parse_amount)]
        amount: u64,
    },
    /// USDCで分割トークンを購入する
    Buy {
        asset: Pubkey,
        /// 購入するトークン数
        #[arg(long, value_parser = parse_amount)]
        tokens: u64,
        /// 支払うUSDC（省略時は見積もり額）
        #[arg(long, value_parser = parse_amount)]
        usdc: Option<u64>,
    },
    /// 分割トークンを他のウォレットへ送金する
    Transfer {
        asset: Pubkey,
        #[arg(long)]
        to: Pubkey,
        #[arg(long, value_parser = parse_amount)]
        amount: u64,
    },
    /// 分割トークンをバーンして償還する
    Redeem {
        asset: Pubkey,
        #[arg(long, value_parser = parse_amount)]
        amount: u64,
    },
    /// 資産の有効/無効を切り替える（資産所有者のみ）
    SetActive {
        asset: Pubkey,
        #[arg(long, action = ArgAction::Set)]
        active: bool,
    },
    /// 資産の詳細を表示する
    Show { asset: Pubkey },
    /// 登録済みの全資産を表示する
    List,
    /// ウォレット残高を表示する（省略時はpayer）
    Balance {
        owner: Option<Pubkey>,
        /// 分割トークン残高も表示する資産（複数指定可）
        #[arg(long = "asset")]
        assets: Vec<Pubkey>,
    },
    /// 資産PDAとMint PDAを導出する
    Pda {
        #[arg(long)]
        owner: Pubkey,
        #[arg(long)]
        name: String,
    },
    /// オフチェーンメタデータの作成・検証
    Metadata {
        #[command(subcommand)]
        command: MetadataCommand,
    },
}

#[derive(Subcommand)]
enum MetadataCommand {
    /// メタデータJSONを作成する
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        image: String,
        /// 属性（`trait=value` 形式、複数指定可）
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<MetadataAttribute>,
        #[arg(long)]
        external_url: Option<String>,
        /// 作成したメタデータをRWA_METADATA_PROVIDERへ保存する
        #[arg(long)]
        upload: bool,
    },
    /// メタデータJSONファイルを検証する
    Validate { file: PathBuf },
}

/// `trait=value` 形式の属性を解釈する。値が整数なら数値属性にする。
fn parse_attribute(s: &str) -> Result<MetadataAttribute, String> {
    let (trait_type, value) = s
        .split_once('=')
        .ok_or_else(|| format!("属性は trait=value 形式で指定してください: {s}"))?;
    let trait_type = trait_type.trim();
    if trait_type.is_empty() {
        return Err(format!("属性名が空です: {s}"));
    }
    let value = value.trim();
    let value = match value.parse::<u64>() {
        Ok(n) => AttributeValue::from(n),
        Err(_) => AttributeValue::from(value),
    };
    Ok(MetadataAttribute {
        trait_type: trait_type.to_string(),
        value,
    })
}

/// 表示単位の10進数を最小単位に変換する。0は受け付けない。
fn parse_amount(s: &str) -> Result<u64, String> {
    let amount = parse_token_amount(s, TOKEN_DECIMALS).map_err(|e| e.to_string())?;
    if amount == 0 {
        return Err(format!("正の数を指定してください: {s}"));
    }
    Ok(amount)
}

/// `--upload` 先として使えるプロバイダか確認する。
/// ローカルストアはプロセス終了で消えるため保存先にできない。
fn require_persistent_provider(provider: MetadataProvider) -> anyhow::Result<()> {
    if provider == MetadataProvider::Local {
        anyhow::bail!(
            "RWA_METADATA_PROVIDER=localはプロセス終了で内容が失われるため--uploadに使えません（arweaveまたはipfsを指定してください）"
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// トランザクション結果を出力し、失敗ならエラーとして返す。
fn finish_tx(result: Result<Signature, SdkError>) -> anyhow::Result<()> {
    print_json(&transaction_result(&result))?;
    result?;
    Ok(())
}

/// 署名が必要な操作用のクライアント。
fn signing_client(config: SdkConfig) -> anyhow::Result<RwaClient> {
    Ok(RwaClient::from_config(config)?)
}

/// 読み取り専用の操作用のクライアント。署名鍵が未設定なら一時鍵を使う。
fn read_client(mut config: SdkConfig) -> RwaClient {
    let payer = config.keypair.take().unwrap_or_else(|| {
        tracing::debug!("署名鍵が未設定のため一時鍵で読み取りを行います");
        Keypair::new()
    });
    RwaClient::new(config.rpc_url, payer, config.network).with_retry_policy(config.retry)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SdkConfig::from_env().context("設定の読み込みに失敗")?;

    match cli.command {
        Command::CreateAsset {
            name,
            description,
            valuation,
            asset_type,
            metadata_uri,
            supply,
        } => {
            let params = CreateAssetParams {
                name,
                description,
                valuation,
                asset_type,
                metadata_uri,
                total_supply: supply,
            };
            params.validate()?;
            let client = signing_client(config)?;
            let asset = client.asset_address(&client.payer(), &params.name)?;
            let result = client.create_asset(&params).await;
            print_json(&json!({
                "asset": asset.to_string(),
                "mint": client.mint_address(&asset).to_string(),
                "transaction": transaction_result(&result),
            }))?;
            result?;
            Ok(())
        }
        Command::Mint { asset, amount } => {
            let client = signing_client(config)?;
            finish_tx(client.mint_tokens(&asset, amount).await)
        }
        Command::Buy { asset, tokens, usdc } => {
            let client = signing_client(config)?;
            finish_tx(client.buy_fraction(&asset, tokens, usdc).await)
        }
        Command::Transfer { asset, to, amount } => {
            let client = signing_client(config)?;
            finish_tx(client.transfer_to_wallet(&asset, &to, amount).await)
        }
        Command::Redeem { asset, amount } => {
            let client = signing_client(config)?;
            finish_tx(client.redeem(&asset, amount).await)
        }
        Command::SetActive { asset, active } => {
            let client = signing_client(config)?;
            finish_tx(client.set_asset_active(&asset, active).await)
        }
        Command::Show { asset } => {
            let client = read_client(config);
            let view = client
                .get_asset_with_metadata(&asset)
                .await?
                .ok_or(SdkError::AssetNotFound(asset.to_string()))?;
            print_json(&view)
        }
        Command::List => {
            let client = read_client(config);
            print_json(&client.get_all_assets().await?)
        }
        Command::Balance { owner, assets } => {
            let owner = match (owner, config.keypair.as_ref()) {
                (Some(owner), _) => owner,
                (None, Some(keypair)) => keypair.pubkey(),
                (None, None) => {
                    anyhow::bail!("ownerを指定するか、RWA_KEYPAIRを設定してください")
                }
            };
            let client = read_client(config);
            let balance = client.get_wallet_balance(&owner, &assets).await?;
            print_json(&json!({
                "owner": owner.to_string(),
                "balance": balance,
            }))
        }
        Command::Pda { owner, name } => {
            let (asset, asset_bump) = derive_asset_pda(&owner, &name)?;
            let (mint, mint_bump) = derive_mint_pda(&asset);
            print_json(&json!({
                "asset": asset.to_string(),
                "asset_bump": asset_bump,
                "mint": mint.to_string(),
                "mint_bump": mint_bump,
            }))
        }
        Command::Metadata { command } => run_metadata(command, config).await,
    }
}

async fn run_metadata(command: MetadataCommand, config: SdkConfig) -> anyhow::Result<()> {
    match command {
        MetadataCommand::Create {
            name,
            description,
            image,
            attributes,
            external_url,
            upload,
        } => {
            let metadata =
                create_asset_metadata(&name, &description, &image, attributes, external_url.as_deref());
            if !upload {
                return print_json(&metadata);
            }
            require_persistent_provider(config.metadata_provider)?;
            let service = create_metadata_service(config.metadata_provider);
            let id = service.upload_metadata(&metadata).await?;
            print_json(&json!({
                "provider": service.provider(),
                "id": id,
                "uri": service.metadata_uri(&id),
                "metadata": metadata,
            }))
        }
        MetadataCommand::Validate { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("ファイルの読み込みに失敗: {}", file.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&content).context("JSONのパースに失敗")?;
            let valid = validate_metadata(&value);
            print_json(&json!({ "file": file.display().to_string(), "valid": valid }))?;
            if !valid {
                anyhow::bail!("メタデータが不正です: {}", file.display());
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_attribute() {
        let attr = parse_attribute("Location=Tokyo").unwrap();
        assert_eq!(attr.trait_type, "Location");
        assert_eq!(attr.value, AttributeValue::from("Tokyo"));

        let attr = parse_attribute("Floors = 12").unwrap();
        assert_eq!(attr.trait_type, "Floors");
        assert_eq!(attr.value, AttributeValue::from(12u64));

        assert!(parse_attribute("no-separator").is_err());
        assert!(parse_attribute("=value").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1.5").unwrap(), 1_500_000);
        assert_eq!(parse_amount("8.2").unwrap(), 8_200_000);
        assert_eq!(parse_amount("0.000001").unwrap(), 1);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("1.0000001").is_err());
    }

    #[test]
    fn test_upload_requires_persistent_provider() {
        assert!(require_persistent_provider(MetadataProvider::Local).is_err());
        assert!(require_persistent_provider(MetadataProvider::Arweave).is_ok());
        assert!(require_persistent_provider(MetadataProvider::Ipfs).is_ok());
    }

    #[tokio::test]
    async fn test_pda_rejects_long_name() {
        let owner = Pubkey::new_unique().to_string();
        let name = "x".repeat(33);
        let cli = Cli::try_parse_from(["rwa-cli", "pda", "--owner", &owner, "--name", &name]).unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.downcast_ref::<SdkError>().is_some());
    }

    #[test]
    fn test_parse_buy_command() {
        let asset = Pubkey::new_unique();
        let cli = Cli::try_parse_from([
            "rwa-cli",
            "buy",
            &asset.to_string(),
            "--tokens",
            "8.2",
            "--usdc",
            "12.3",
        ])
        .unwrap();
        match cli.command {
            Command::Buy { asset: a, tokens, usdc } => {
                assert_eq!(a, asset);
                assert_eq!(tokens, 8_200_000);
                assert_eq!(usdc, Some(12_300_000));
            }
            _ => panic!("unexpected command"),
        }

        let asset = asset.to_string();
        assert!(Cli::try_parse_from(["rwa-cli", "buy", &asset, "--tokens", "0"]).is_err());
        assert!(Cli::try_parse_from(["rwa-cli", "buy", &asset, "--tokens", "0.0000001"]).is_err());
    }

    #[test]
    fn test_parse_create_asset_type() {
        let cli = Cli::try_parse_from([
            "rwa-cli",
            "create-asset",
            "--name",
            "Tokyo Office",
            "--valuation",
            "1500000",
            "--type",
            "real-estate",
            "--supply",
            "1000000",
        ])
        .unwrap();
        match cli.command {
            Command::CreateAsset { asset_type, .. } => assert_eq!(asset_type, AssetType::RealEstate),
            _ => panic!("unexpected command"),
        }
        assert!(Cli::try_parse_from(["rwa-cli", "create-asset", "--name", "x", "--type", "spaceship"]).is_err());
    }

    #[test]
    fn test_parse_set_active_requires_value() {
        let asset = Pubkey::new_unique().to_string();
        let cli = Cli::try_parse_from(["rwa-cli", "set-active", &asset, "--active", "false"]).unwrap();
        assert!(matches!(cli.command, Command::SetActive { active: false, .. }));
    }
}
