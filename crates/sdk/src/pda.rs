//! # PDA導出
//!
//! 資産PDA、Mint PDA、関連トークンアカウント（ATA）のアドレスを導出する。
//! いずれも決定論的で、同じ入力からは常に同じ `(アドレス, bump)` が得られる。
//! 資産名はシード1要素の上限（32バイト）を超えると導出できないため、資産PDAの導出は `Result` を返す。

use solana_sdk::pubkey::{Pubkey, MAX_SEED_LEN};

use crate::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::error::SdkError;

/// 資産PDAのシードプレフィックス
pub const ASSET_SEED: &[u8] = b"asset";
/// Mint PDAのシードプレフィックス
pub const MINT_SEED: &[u8] = b"mint";

/// 資産PDAを導出する。
/// seeds = ["asset", owner, name], program = rwa-token
pub fn derive_asset_pda(owner: &Pubkey, name: &str) -> Result<(Pubkey, u8), SdkError> {
    derive_asset_pda_with_program(owner, name, &PROGRAM_ID)
}

/// 任意のプログラムIDで資産PDAを導出する（ローカル検証用デプロイ等）。
pub fn derive_asset_pda_with_program(
    owner: &Pubkey,
    name: &str,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SdkError> {
    if name.len() > MAX_SEED_LEN {
        return Err(SdkError::InvalidInput(format!(
            "資産名は{MAX_SEED_LEN}バイト以下である必要があります: {} bytes",
            name.len()
        )));
    }
    Pubkey::try_find_program_address(&[ASSET_SEED, owner.as_ref(), name.as_bytes()], program_id)
        .ok_or_else(|| SdkError::InvalidInput(format!("資産PDAを導出できません: {name}")))
}

/// 分割トークンMint PDAを導出する。
/// seeds = ["mint", asset], program = rwa-token
pub fn derive_mint_pda(asset: &Pubkey) -> (Pubkey, u8) {
    derive_mint_pda_with_program(asset, &PROGRAM_ID)
}

pub fn derive_mint_pda_with_program(asset: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MINT_SEED, asset.as_ref()], program_id)
}

/// 関連トークンアカウント（ATA）のアドレスを導出する。
/// seeds = [wallet, token_program, mint], program = Associated Token Account
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_derive_asset_pda_deterministic() {
        let owner = Pubkey::new_unique();
        let (pda, bump) = derive_asset_pda(&owner, "Tokyo Office").unwrap();
        let (pda2, bump2) = derive_asset_pda(&owner, "Tokyo Office").unwrap();
        assert_eq!(pda, pda2);
        assert_eq!(bump, bump2);
        assert!(!pda.is_on_curve());
    }

    #[test]
    fn test_derive_asset_pda_depends_on_owner_and_name() {
        let owner = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let (a, _) = derive_asset_pda(&owner, "Asset A").unwrap();
        let (b, _) = derive_asset_pda(&owner, "Asset B").unwrap();
        let (c, _) = derive_asset_pda(&other, "Asset A").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derive_mint_pda() {
        let owner = Pubkey::from_str("11111111111111111111111111111112").unwrap();
        let (asset, _) = derive_asset_pda(&owner, "Test Asset").unwrap();
        let (mint, bump) = derive_mint_pda(&asset);
        assert_ne!(mint, asset);
        assert_eq!(derive_mint_pda(&asset), (mint, bump));
    }

    #[test]
    fn test_pda_depends_on_program_id() {
        let owner = Pubkey::new_unique();
        let other_program = Pubkey::new_unique();
        assert_ne!(
            derive_asset_pda(&owner, "x").unwrap().0,
            derive_asset_pda_with_program(&owner, "x", &other_program).unwrap().0
        );
    }

    #[test]
    fn test_derive_asset_pda_rejects_long_name() {
        let owner = Pubkey::new_unique();
        assert!(derive_asset_pda(&owner, &"x".repeat(MAX_SEED_LEN)).is_ok());
        assert!(matches!(
            derive_asset_pda(&owner, &"x".repeat(MAX_SEED_LEN + 1)),
            Err(SdkError::InvalidInput(_))
        ));
        // 文字数ではなくバイト数で判定する（「資」は3バイト）
        assert!(derive_asset_pda(&owner, &"資".repeat(11)).is_err());
    }

    #[test]
    fn test_associated_token_address() {
        // ウォレット・Mintごとに異なるアドレスになること
        let wallet = Pubkey::new_unique();
        let mint_a = Pubkey::new_unique();
        let mint_b = Pubkey::new_unique();
        let ata_a = associated_token_address(&wallet, &mint_a);
        assert_eq!(ata_a, associated_token_address(&wallet, &mint_a));
        assert_ne!(ata_a, associated_token_address(&wallet, &mint_b));
        assert_ne!(ata_a, associated_token_address(&Pubkey::new_unique(), &mint_a));
    }
}
