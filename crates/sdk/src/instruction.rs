//! # rwa-token 命令の構築
//!
//! 命令データはAnchor互換の形式で構築する:
//! `sha256("global:<命令名>")[..8]` + Borsh(引数)
//!
//! アカウントの並び順と書き込み/署名フラグはプログラム側の
//! `#[derive(Accounts)]` 構造体の宣言順と一致させる。

use borsh::BorshSerialize;
use rwa_types::AssetType;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::constants::{
    ASSOCIATED_TOKEN_PROGRAM_ID, RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use crate::error::SdkError;
use crate::pda::{associated_token_address, derive_mint_pda_with_program};

/// Anchor命令ディスクリミネータを計算する。
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// ディスクリミネータ + Borsh引数の命令データを構築する。
fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> Result<Vec<u8>, SdkError> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)
        .map_err(|e| SdkError::Serialization(format!("命令引数のシリアライズに失敗 ({name}): {e}")))?;
    Ok(data)
}

// ---------------------------------------------------------------------------
// 引数
// ---------------------------------------------------------------------------

#[derive(BorshSerialize)]
struct InitializeAssetArgs<'a> {
    name: &'a str,
    description: &'a str,
    valuation: u64,
    asset_type: AssetType,
    metadata_uri: &'a str,
    total_supply: u64,
}

#[derive(BorshSerialize)]
struct AmountArgs {
    amount: u64,
}

#[derive(BorshSerialize)]
struct BuyFractionArgs {
    usdc_amount: u64,
    expected_tokens: u64,
}

#[derive(BorshSerialize)]
struct SetAssetActiveArgs {
    is_active: bool,
}

// ---------------------------------------------------------------------------
// 命令ビルダー
// ---------------------------------------------------------------------------

/// initialize_asset命令。
///
/// 署名者: owner（fee payer兼資産所有者）
#[allow(clippy::too_many_arguments)]
pub fn initialize_asset(
    program_id: &Pubkey,
    owner: &Pubkey,
    asset: &Pubkey,
    name: &str,
    description: &str,
    valuation: u64,
    asset_type: AssetType,
    metadata_uri: &str,
    total_supply: u64,
) -> Result<Instruction, SdkError> {
    let (mint, _) = derive_mint_pda_with_program(asset, program_id);
    let data = instruction_data(
        "initialize_asset",
        &InitializeAssetArgs {
            name,
            description,
            valuation,
            asset_type,
            metadata_uri,
            total_supply,
        },
    )?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*asset, false),
            AccountMeta::new(mint, false),
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
        ],
        data,
    })
}

/// mint_fractional_tokens命令。
/// ミント先はauthorityの関連トークンアカウント（未作成ならプログラムが作成する）。
pub fn mint_fractional_tokens(
    program_id: &Pubkey,
    asset: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, SdkError> {
    let (mint, _) = derive_mint_pda_with_program(asset, program_id);
    let token_account = associated_token_address(authority, &mint);
    let data = instruction_data("mint_fractional_tokens", &AmountArgs { amount })?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*asset, false),
            AccountMeta::new(mint, false),
            AccountMeta::new(token_account, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}

/// transfer_fractional_tokens命令。
pub fn transfer_fractional_tokens(
    program_id: &Pubkey,
    from_token_account: &Pubkey,
    to_token_account: &Pubkey,
    mint: &Pubkey,
    from_authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, SdkError> {
    let data = instruction_data("transfer_fractional_tokens", &AmountArgs { amount })?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*from_token_account, false),
            AccountMeta::new(*to_token_account, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*from_authority, true),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data,
    })
}

/// buy_fraction命令。
///
/// 購入者のUSDCアカウント・分割トークンアカウントはいずれもATAを使う。
/// 支払先は資産所有者のUSDC ATA。
pub fn buy_fraction(
    program_id: &Pubkey,
    asset: &Pubkey,
    asset_owner: &Pubkey,
    buyer: &Pubkey,
    usdc_mint: &Pubkey,
    usdc_amount: u64,
    expected_tokens: u64,
) -> Result<Instruction, SdkError> {
    let (mint, _) = derive_mint_pda_with_program(asset, program_id);
    let data = instruction_data(
        "buy_fraction",
        &BuyFractionArgs {
            usdc_amount,
            expected_tokens,
        },
    )?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*asset, false),
            AccountMeta::new(mint, false),
            AccountMeta::new_readonly(*usdc_mint, false),
            AccountMeta::new(*buyer, true),
            AccountMeta::new(associated_token_address(buyer, usdc_mint), false),
            AccountMeta::new(associated_token_address(buyer, &mint), false),
            AccountMeta::new(associated_token_address(asset_owner, usdc_mint), false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data,
    })
}

/// redeem命令。バーン元はuserの関連トークンアカウント。
pub fn redeem(
    program_id: &Pubkey,
    asset: &Pubkey,
    user: &Pubkey,
    token_amount: u64,
) -> Result<Instruction, SdkError> {
    let (mint, _) = derive_mint_pda_with_program(asset, program_id);
    let data = instruction_data("redeem", &AmountArgs { amount: token_amount })?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*asset, false),
            AccountMeta::new(mint, false),
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(associated_token_address(user, &mint), false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data,
    })
}

/// set_asset_active命令。
pub fn set_asset_active(
    program_id: &Pubkey,
    asset: &Pubkey,
    owner: &Pubkey,
    is_active: bool,
) -> Result<Instruction, SdkError> {
    let data = instruction_data("set_asset_active", &SetAssetActiveArgs { is_active })?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*asset, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data,
    })
}

/// 関連トークンアカウントを冪等に作成する命令（ATAプログラムのCreateIdempotent）。
/// 既に存在する場合は何もしない。
pub fn create_associated_token_account_idempotent(
    funder: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*funder, true),
            AccountMeta::new(associated_token_address(wallet, mint), false),
            AccountMeta::new_readonly(*wallet, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        // 0 = Create, 1 = CreateIdempotent
        data: vec![1],
    }
}
