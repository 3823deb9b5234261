//! # 資産アカウント
//!
//! オンチェーンの `Asset` アカウントのデコードと、UI/CLI向けの表示用ビュー。

use borsh::{BorshDeserialize, BorshSerialize};
use rwa_types::{AssetMetadata, AssetType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;
use crate::math;
use crate::pda::derive_mint_pda_with_program;

/// Anchorアカウントディスクリミネータを計算する。
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// `Asset` アカウントのディスクリミネータ。
pub fn asset_discriminator() -> [u8; 8] {
    account_discriminator("Asset")
}

/// オンチェーンレイアウト（ディスクリミネータ以降）。
#[derive(BorshSerialize, BorshDeserialize)]
struct AssetWire {
    owner: [u8; 32],
    name: String,
    description: String,
    valuation: u64,
    asset_type: AssetType,
    metadata_uri: String,
    total_supply: u64,
    minted_supply: u64,
    created_at: i64,
    last_mint_at: i64,
    last_redeem_at: i64,
    is_active: bool,
    bump: u8,
    mint_bump: u8,
}

/// デコード済みの資産アカウント。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAccount {
    pub owner: Pubkey,
    pub name: String,
    pub description: String,
    /// 評価額（USDC最小単位）
    pub valuation: u64,
    pub asset_type: AssetType,
    pub metadata_uri: String,
    pub total_supply: u64,
    pub minted_supply: u64,
    pub created_at: i64,
    pub last_mint_at: i64,
    pub last_redeem_at: i64,
    pub is_active: bool,
    pub bump: u8,
    pub mint_bump: u8,
}

impl AssetAccount {
    /// アカウントデータ（ディスクリミネータ込み）からデコードする。
    ///
    /// アカウントは `8 + INIT_SPACE` で確保されるため末尾に余白があり得る。
    /// 余白は無視する。
    pub fn decode(data: &[u8]) -> Result<Self, SdkError> {
        if data.len() < 8 {
            return Err(SdkError::InvalidAccount(format!(
                "データ長が不足しています: {} bytes",
                data.len()
            )));
        }
        if data[..8] != asset_discriminator() {
            return Err(SdkError::InvalidAccount(
                "Assetアカウントのディスクリミネータと一致しません".to_string(),
            ));
        }

        let mut rest = &data[8..];
        let wire = AssetWire::deserialize(&mut rest)
            .map_err(|e| SdkError::InvalidAccount(format!("Assetのデコードに失敗: {e}")))?;

        Ok(Self {
            owner: Pubkey::new_from_array(wire.owner),
            name: wire.name,
            description: wire.description,
            valuation: wire.valuation,
            asset_type: wire.asset_type,
            metadata_uri: wire.metadata_uri,
            total_supply: wire.total_supply,
            minted_supply: wire.minted_supply,
            created_at: wire.created_at,
            last_mint_at: wire.last_mint_at,
            last_redeem_at: wire.last_redeem_at,
            is_active: wire.is_active,
            bump: wire.bump,
            mint_bump: wire.mint_bump,
        })
    }

    /// オンチェーンと同じレイアウトにエンコードする（ディスクリミネータ込み）。
    pub fn encode(&self) -> Result<Vec<u8>, SdkError> {
        let wire = AssetWire {
            owner: self.owner.to_bytes(),
            name: self.name.clone(),
            description: self.description.clone(),
            valuation: self.valuation,
            asset_type: self.asset_type,
            metadata_uri: self.metadata_uri.clone(),
            total_supply: self.total_supply,
            minted_supply: self.minted_supply,
            created_at: self.created_at,
            last_mint_at: self.last_mint_at,
            last_redeem_at: self.last_redeem_at,
            is_active: self.is_active,
            bump: self.bump,
            mint_bump: self.mint_bump,
        };
        let mut data = asset_discriminator().to_vec();
        wire.serialize(&mut data)
            .map_err(|e| SdkError::Serialization(format!("Assetのエンコードに失敗: {e}")))?;
        Ok(data)
    }

    /// 1トークンあたりの価格（USDC）。
    pub fn token_price(&self) -> f64 {
        math::calculate_token_price(self.valuation, self.total_supply)
    }

    /// 時価総額（USDC）。
    pub fn market_cap(&self) -> f64 {
        math::calculate_market_cap(self.token_price(), self.total_supply)
    }

    /// 未発行のトークン数（表示単位）。
    pub fn available_supply(&self) -> f64 {
        math::calculate_available_supply(self.total_supply, self.minted_supply)
    }
}

/// 資産の表示用ビュー。アドレスはBase58文字列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetView {
    pub address: String,
    pub mint: String,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub valuation: u64,
    pub asset_type: AssetType,
    pub metadata_uri: String,
    pub total_supply: u64,
    pub minted_supply: u64,
    pub created_at: i64,
    pub last_mint_at: i64,
    pub last_redeem_at: i64,
    pub is_active: bool,
    /// 1トークンあたりの価格（USDC）
    pub token_price: f64,
    /// 時価総額（USDC）
    pub market_cap: f64,
    /// 未発行のトークン数（表示単位）
    pub available_supply: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AssetMetadata>,
}

impl AssetView {
    pub fn new(
        address: &Pubkey,
        program_id: &Pubkey,
        asset: &AssetAccount,
        metadata: Option<AssetMetadata>,
    ) -> Self {
        let (mint, _) = derive_mint_pda_with_program(address, program_id);
        Self {
            address: address.to_string(),
            mint: mint.to_string(),
            owner: asset.owner.to_string(),
            name: asset.name.clone(),
            description: asset.description.clone(),
            valuation: asset.valuation,
            asset_type: asset.asset_type,
            metadata_uri: asset.metadata_uri.clone(),
            total_supply: asset.total_supply,
            minted_supply: asset.minted_supply,
            created_at: asset.created_at,
            last_mint_at: asset.last_mint_at,
            last_redeem_at: asset.last_redeem_at,
            is_active: asset.is_active,
            token_price: asset.token_price(),
            market_cap: asset.market_cap(),
            available_supply: asset.available_supply(),
            metadata,
        }
    }
}
