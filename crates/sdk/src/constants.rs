//! # 定数・ネットワーク設定

use rwa_types::Network;
use solana_sdk::pubkey::Pubkey;

/// rwa-tokenプログラムID
pub const PROGRAM_ID: Pubkey = solana_sdk::pubkey!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

/// USDC Mint（mainnet）
pub const USDC_MINT: Pubkey = solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDC Mint（devnet/testnet）
pub const USDC_MINT_DEVNET: Pubkey =
    solana_sdk::pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

pub const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");
pub const TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const RENT_SYSVAR_ID: Pubkey =
    solana_sdk::pubkey!("SysvarRent111111111111111111111111111111111");

/// 分割トークン・USDCの小数桁数
pub const TOKEN_DECIMALS: u8 = 6;
/// SOLの小数桁数
pub const SOL_DECIMALS: u8 = 9;
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// トランザクション確定を待つコミットメント
pub const COMMITMENT: &str = "confirmed";
/// プリフライトシミュレーションのコミットメント
pub const PREFLIGHT_COMMITMENT: &str = "processed";
/// RPC呼び出しの既定リトライ回数
pub const MAX_RETRIES: u32 = 3;

/// オンチェーンの入力上限
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_METADATA_URI_LEN: usize = 200;

/// 購入時のスリッページ許容（パーセント）。オンチェーンの検査と一致させる。
pub const SLIPPAGE_TOLERANCE_PCT: u64 = 1;

/// ネットワークごとの接続設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: &'static str,
    pub url: &'static str,
    pub usdc_mint: Pubkey,
}

/// ネットワーク設定を返す。localnetはdevnetのUSDC Mintを使用する。
pub fn network_config(network: Network) -> NetworkConfig {
    match network {
        Network::Mainnet => NetworkConfig {
            name: "Mainnet",
            url: "https://api.mainnet-beta.solana.com",
            usdc_mint: USDC_MINT,
        },
        Network::Devnet => NetworkConfig {
            name: "Devnet",
            url: "https://api.devnet.solana.com",
            usdc_mint: USDC_MINT_DEVNET,
        },
        Network::Localnet => NetworkConfig {
            name: "Localnet",
            url: "http://127.0.0.1:8899",
            usdc_mint: USDC_MINT_DEVNET,
        },
    }
}

/// ネットワークごとのRPCエンドポイント候補（先頭が既定）。
pub fn rpc_endpoints(network: Network) -> &'static [&'static str] {
    match network {
        Network::Mainnet => &["https://api.mainnet-beta.solana.com"],
        Network::Devnet => &["https://api.devnet.solana.com"],
        Network::Localnet => &["http://127.0.0.1:8899"],
    }
}

/// ネットワークに対応するUSDC Mintを返す。
pub fn usdc_mint(network: Network) -> Pubkey {
    network_config(network).usdc_mint
}
