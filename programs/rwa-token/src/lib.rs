//! # RWA Portal Anchor Solanaプログラム
//!
//! 現実資産（RWA）を資産PDAとして登録し、資産ごとのSPL Mintで分割トークンを発行する。
//!
//! ## 命令
//! - `initialize_asset`: 資産PDAと分割トークンMintの作成
//! - `mint_fractional_tokens`: 資産所有者による分割トークンのミント
//! - `transfer_fractional_tokens`: 保有者間の分割トークン移転
//! - `buy_fraction`: USDC支払いによる分割トークンの購入
//! - `redeem`: 分割トークンの償還（バーン）
//! - `set_asset_active`: 資産の有効/無効の切り替え
//!
//! ## PDA
//! - 資産: `["asset", owner, name]`
//! - Mint: `["mint", asset]`（decimals = 6、mint authority = 資産PDA）
//!
//! ## フィーチャー
//! - `mainnet`: 支払いに受け付けるUSDC Mintをmainnetのものにする（既定はdevnet）

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, CreateAccount};
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{self, Burn, Mint, MintTo, Token, TokenAccount, TransferChecked};

pub mod math;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

/// 資産PDAのシードプレフィックス
pub const ASSET_SEED: &[u8] = b"asset";
/// Mint PDAのシードプレフィックス
pub const MINT_SEED: &[u8] = b"mint";
/// 分割トークンの小数桁数（USDCと同じ6桁）
pub const TOKEN_DECIMALS: u8 = 6;

/// 資産名の最大長。PDAシード1要素の上限（32バイト）に合わせる。
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_METADATA_URI_LEN: usize = 200;

/// 支払いに受け付けるUSDC Mint
#[cfg(feature = "mainnet")]
pub const USDC_MINT: Pubkey =
    anchor_lang::solana_program::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
#[cfg(not(feature = "mainnet"))]
pub const USDC_MINT: Pubkey =
    anchor_lang::solana_program::pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

#[program]
pub mod rwa_token {
    use super::*;

    /// 資産PDAと分割トークンMintを作成する。
    ///
    /// 資産PDAのシードには資産名が含まれるため、長さ検査の後に命令本体で作成する。
    pub fn initialize_asset(
        ctx: Context<InitializeAsset>,
        name: String,
        description: String,
        valuation: u64,
        asset_type: AssetType,
        metadata_uri: String,
        total_supply: u64,
    ) -> Result<()> {
        validate_asset_params(&name, &description, &metadata_uri, valuation, total_supply)?;

        let owner = ctx.accounts.owner.key();
        let asset_key = ctx.accounts.asset.key();
        let (expected, bump) = Pubkey::find_program_address(
            &[ASSET_SEED, owner.as_ref(), name.as_bytes()],
            ctx.program_id,
        );
        require_keys_eq!(expected, asset_key, ErrorCode::InvalidAssetAddress);

        let space = 8 + Asset::INIT_SPACE;
        let lamports = Rent::get()?.minimum_balance(space);
        let bump_seed = [bump];
        let seeds: &[&[u8]] = &[ASSET_SEED, owner.as_ref(), name.as_bytes(), &bump_seed];
        system_program::create_account(
            CpiContext::new_with_signer(
                ctx.accounts.system_program.to_account_info(),
                CreateAccount {
                    from: ctx.accounts.owner.to_account_info(),
                    to: ctx.accounts.asset.to_account_info(),
                },
                &[seeds],
            ),
            lamports,
            space as u64,
            ctx.program_id,
        )?;

        let asset = Asset {
            owner,
            name,
            description,
            valuation,
            asset_type,
            metadata_uri,
            total_supply,
            minted_supply: 0,
            created_at: Clock::get()?.unix_timestamp,
            last_mint_at: 0,
            last_redeem_at: 0,
            is_active: true,
            bump,
            mint_bump: ctx.bumps.mint,
        };
        let info = ctx.accounts.asset.to_account_info();
        let mut data = info.try_borrow_mut_data()?;
        let mut writer: &mut [u8] = &mut data[..];
        asset.try_serialize(&mut writer)?;

        emit!(AssetInitialized {
            asset: asset_key,
            owner,
            mint: ctx.accounts.mint.key(),
            valuation,
            total_supply,
        });

        msg!("資産を登録: asset={}, owner={}", asset_key, owner);
        Ok(())
    }

    /// 資産所有者が分割トークンをミントする。
    /// 所有者の関連トークンアカウントは必要に応じて作成される。
    pub fn mint_fractional_tokens(ctx: Context<MintFractionalTokens>, amount: u64) -> Result<()> {
        let asset = &ctx.accounts.asset;
        require!(asset.is_active, ErrorCode::AssetInactive);
        require!(amount > 0, ErrorCode::InvalidAmount);

        let new_minted = math::checked_add(asset.minted_supply, amount)?;
        require!(new_minted <= asset.total_supply, ErrorCode::SupplyExceeded);

        let bump = [asset.bump];
        let seeds: &[&[u8]] = &[
            ASSET_SEED,
            asset.owner.as_ref(),
            asset.name.as_bytes(),
            &bump,
        ];
        let signer = &[seeds];

        let cpi_accounts = MintTo {
            mint: ctx.accounts.mint.to_account_info(),
            to: ctx.accounts.token_account.to_account_info(),
            authority: ctx.accounts.asset.to_account_info(),
        };
        let cpi_ctx = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            cpi_accounts,
            signer,
        );
        token::mint_to(cpi_ctx, amount)?;

        let asset = &mut ctx.accounts.asset;
        asset.minted_supply = new_minted;
        asset.last_mint_at = Clock::get()?.unix_timestamp;

        emit!(TokensMinted {
            asset: asset.key(),
            to: ctx.accounts.token_account.key(),
            amount,
            minted_supply: new_minted,
        });
        Ok(())
    }

    /// 保有者間で分割トークンを移転する。
    pub fn transfer_fractional_tokens(
        ctx: Context<TransferFractionalTokens>,
        amount: u64,
    ) -> Result<()> {
        require!(amount > 0, ErrorCode::InvalidAmount);

        let cpi_accounts = TransferChecked {
            from: ctx.accounts.from_token_account.to_account_info(),
            mint: ctx.accounts.mint.to_account_info(),
            to: ctx.accounts.to_token_account.to_account_info(),
            authority: ctx.accounts.from_authority.to_account_info(),
        };
        let cpi_ctx = CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts);
        token::transfer_checked(cpi_ctx, amount, ctx.accounts.mint.decimals)?;

        Ok(())
    }

    /// USDCを支払って分割トークンを購入する。
    ///
    /// 支払額は `expected_tokens * valuation / total_supply` を基準とし、
    /// 1%のスリッページまで許容する。USDCは資産所有者に直接送金される。
    pub fn buy_fraction(
        ctx: Context<BuyFraction>,
        usdc_amount: u64,
        expected_tokens: u64,
    ) -> Result<()> {
        let asset = &ctx.accounts.asset;
        require!(asset.is_active, ErrorCode::AssetInactive);
        require!(usdc_amount > 0, ErrorCode::InvalidAmount);
        require!(expected_tokens > 0, ErrorCode::InvalidAmount);

        let expected_usdc =
            math::expected_payment(expected_tokens, asset.valuation, asset.total_supply)?;
        let min_usdc = math::min_accepted_payment(expected_usdc)?;
        require!(usdc_amount >= min_usdc, ErrorCode::SlippageExceeded);

        let new_minted = math::checked_add(asset.minted_supply, expected_tokens)?;
        require!(new_minted <= asset.total_supply, ErrorCode::SupplyExceeded);

        // 購入者 → 資産所有者へのUSDC送金
        let transfer_accounts = TransferChecked {
            from: ctx.accounts.buyer_usdc_account.to_account_info(),
            mint: ctx.accounts.usdc_mint.to_account_info(),
            to: ctx.accounts.owner_usdc_account.to_account_info(),
            authority: ctx.accounts.buyer.to_account_info(),
        };
        token::transfer_checked(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                transfer_accounts,
            ),
            usdc_amount,
            ctx.accounts.usdc_mint.decimals,
        )?;

        // 資産PDAの署名で購入者にミント
        let bump = [asset.bump];
        let seeds: &[&[u8]] = &[
            ASSET_SEED,
            asset.owner.as_ref(),
            asset.name.as_bytes(),
            &bump,
        ];
        let signer = &[seeds];

        let mint_accounts = MintTo {
            mint: ctx.accounts.mint.to_account_info(),
            to: ctx.accounts.buyer_token_account.to_account_info(),
            authority: ctx.accounts.asset.to_account_info(),
        };
        token::mint_to(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                mint_accounts,
                signer,
            ),
            expected_tokens,
        )?;

        let asset = &mut ctx.accounts.asset;
        asset.minted_supply = new_minted;
        asset.last_mint_at = Clock::get()?.unix_timestamp;

        emit!(FractionPurchased {
            asset: asset.key(),
            buyer: ctx.accounts.buyer.key(),
            usdc_amount,
            tokens: expected_tokens,
        });

        msg!(
            "分割トークン購入: asset={}, tokens={}, usdc={}",
            asset.key(),
            expected_tokens,
            usdc_amount
        );
        Ok(())
    }

    /// 分割トークンを償還（バーン）する。
    pub fn redeem(ctx: Context<Redeem>, token_amount: u64) -> Result<()> {
        let asset = &ctx.accounts.asset;
        require!(asset.is_active, ErrorCode::AssetInactive);
        require!(token_amount > 0, ErrorCode::InvalidAmount);
        require!(
            ctx.accounts.user_token_account.amount >= token_amount,
            ErrorCode::InsufficientTokens
        );

        let new_minted = math::checked_sub(asset.minted_supply, token_amount)?;

        let burn_accounts = Burn {
            mint: ctx.accounts.mint.to_account_info(),
            from: ctx.accounts.user_token_account.to_account_info(),
            authority: ctx.accounts.user.to_account_info(),
        };
        token::burn(
            CpiContext::new(ctx.accounts.token_program.to_account_info(), burn_accounts),
            token_amount,
        )?;

        let asset = &mut ctx.accounts.asset;
        asset.minted_supply = new_minted;
        asset.last_redeem_at = Clock::get()?.unix_timestamp;

        emit!(TokensRedeemed {
            asset: asset.key(),
            user: ctx.accounts.user.key(),
            amount: token_amount,
            minted_supply: new_minted,
        });
        Ok(())
    }

    /// 資産の有効/無効を切り替える（所有者のみ）。
    /// 無効な資産ではミント・購入・償還ができない。
    pub fn set_asset_active(ctx: Context<SetAssetActive>, is_active: bool) -> Result<()> {
        let asset = &mut ctx.accounts.asset;
        asset.is_active = is_active;

        emit!(AssetStatusChanged {
            asset: asset.key(),
            is_active,
        });

        msg!("資産ステータス変更: asset={}, active={}", asset.key(), is_active);
        Ok(())
    }
}

/// 資産登録の入力検査。資産PDAの導出より前に呼ぶ。
pub fn validate_asset_params(
    name: &str,
    description: &str,
    metadata_uri: &str,
    valuation: u64,
    total_supply: u64,
) -> Result<()> {
    require!(name.len() <= MAX_NAME_LEN, ErrorCode::NameTooLong);
    require!(
        description.len() <= MAX_DESCRIPTION_LEN,
        ErrorCode::DescriptionTooLong
    );
    require!(
        metadata_uri.len() <= MAX_METADATA_URI_LEN,
        ErrorCode::MetadataUriTooLong
    );
    require!(total_supply > 0, ErrorCode::InvalidSupply);
    require!(valuation > 0, ErrorCode::InvalidValuation);
    Ok(())
}

// ---------------------------------------------------------------------------
// アカウント構造
// ---------------------------------------------------------------------------

/// 資産PDA。
#[account]
#[derive(InitSpace)]
pub struct Asset {
    /// 資産所有者（USDCの受取先）
    pub owner: Pubkey,
    #[max_len(32)]
    pub name: String,
    #[max_len(500)]
    pub description: String,
    /// 評価額（USDC、6桁）
    pub valuation: u64,
    pub asset_type: AssetType,
    /// オフチェーンメタデータのURI
    #[max_len(200)]
    pub metadata_uri: String,
    /// 分割トークンの発行上限
    pub total_supply: u64,
    /// 現在の流通量（ミント済み - 償還済み）
    pub minted_supply: u64,
    pub created_at: i64,
    pub last_mint_at: i64,
    pub last_redeem_at: i64,
    pub is_active: bool,
    pub bump: u8,
    pub mint_bump: u8,
}

/// 資産の種別。
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, InitSpace)]
pub enum AssetType {
    Land,
    Art,
    Carbon,
    RealEstate,
    Commodity,
    Other,
}

// ---------------------------------------------------------------------------
// Context構造体
// ---------------------------------------------------------------------------

/// initialize_asset命令のアカウント。
#[derive(Accounts)]
pub struct InitializeAsset<'info> {
    /// CHECK: 資産PDA。命令本体でシード `["asset", owner, name]` と照合してから作成する。
    #[account(mut)]
    pub asset: UncheckedAccount<'info>,

    #[account(
        init,
        payer = owner,
        mint::decimals = TOKEN_DECIMALS,
        mint::authority = asset,
        seeds = [b"mint", asset.key().as_ref()],
        bump
    )]
    pub mint: Account<'info, Mint>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub rent: Sysvar<'info, Rent>,
}

/// mint_fractional_tokens命令のアカウント。
#[derive(Accounts)]
pub struct MintFractionalTokens<'info> {
    #[account(
        mut,
        seeds = [b"asset", asset.owner.as_ref(), asset.name.as_bytes()],
        bump = asset.bump,
        constraint = asset.owner == authority.key() @ ErrorCode::Unauthorized
    )]
    pub asset: Account<'info, Asset>,

    #[account(
        mut,
        seeds = [b"mint", asset.key().as_ref()],
        bump = asset.mint_bump
    )]
    pub mint: Account<'info, Mint>,

    #[account(
        init_if_needed,
        payer = authority,
        associated_token::mint = mint,
        associated_token::authority = authority
    )]
    pub token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

/// transfer_fractional_tokens命令のアカウント。
#[derive(Accounts)]
pub struct TransferFractionalTokens<'info> {
    #[account(
        mut,
        constraint = from_token_account.mint == mint.key() @ ErrorCode::MintMismatch
    )]
    pub from_token_account: Account<'info, TokenAccount>,
    #[account(
        mut,
        constraint = to_token_account.mint == mint.key() @ ErrorCode::MintMismatch
    )]
    pub to_token_account: Account<'info, TokenAccount>,
    pub mint: Account<'info, Mint>,
    pub from_authority: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

/// buy_fraction命令のアカウント。
#[derive(Accounts)]
pub struct BuyFraction<'info> {
    #[account(
        mut,
        seeds = [b"asset", asset.owner.as_ref(), asset.name.as_bytes()],
        bump = asset.bump
    )]
    pub asset: Account<'info, Asset>,

    #[account(
        mut,
        seeds = [b"mint", asset.key().as_ref()],
        bump = asset.mint_bump
    )]
    pub mint: Account<'info, Mint>,

    #[account(address = USDC_MINT @ ErrorCode::InvalidPaymentAccount)]
    pub usdc_mint: Account<'info, Mint>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    #[account(
        mut,
        constraint = buyer_usdc_account.owner == buyer.key() @ ErrorCode::InvalidPaymentAccount,
        constraint = buyer_usdc_account.mint == usdc_mint.key() @ ErrorCode::InvalidPaymentAccount
    )]
    pub buyer_usdc_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = buyer_token_account.mint == mint.key() @ ErrorCode::MintMismatch
    )]
    pub buyer_token_account: Account<'info, TokenAccount>,

    /// 資産所有者のUSDCアカウント（支払先）
    #[account(
        mut,
        constraint = owner_usdc_account.owner == asset.owner @ ErrorCode::InvalidPaymentAccount,
        constraint = owner_usdc_account.mint == usdc_mint.key() @ ErrorCode::InvalidPaymentAccount
    )]
    pub owner_usdc_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

/// redeem命令のアカウント。
#[derive(Accounts)]
pub struct Redeem<'info> {
    #[account(
        mut,
        seeds = [b"asset", asset.owner.as_ref(), asset.name.as_bytes()],
        bump = asset.bump
    )]
    pub asset: Account<'info, Asset>,

    #[account(
        mut,
        seeds = [b"mint", asset.key().as_ref()],
        bump = asset.mint_bump
    )]
    pub mint: Account<'info, Mint>,

    pub user: Signer<'info>,

    #[account(
        mut,
        associated_token::mint = mint,
        associated_token::authority = user
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

/// set_asset_active命令のアカウント。
#[derive(Accounts)]
pub struct SetAssetActive<'info> {
    #[account(
        mut,
        seeds = [b"asset", owner.key().as_ref(), asset.name.as_bytes()],
        bump = asset.bump,
        has_one = owner @ ErrorCode::Unauthorized
    )]
    pub asset: Account<'info, Asset>,
    pub owner: Signer<'info>,
}

// ---------------------------------------------------------------------------
// イベント
// ---------------------------------------------------------------------------

#[event]
pub struct AssetInitialized {
    pub asset: Pubkey,
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub valuation: u64,
    pub total_supply: u64,
}

#[event]
pub struct TokensMinted {
    pub asset: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
    pub minted_supply: u64,
}

#[event]
pub struct FractionPurchased {
    pub asset: Pubkey,
    pub buyer: Pubkey,
    pub usdc_amount: u64,
    pub tokens: u64,
}

#[event]
pub struct TokensRedeemed {
    pub asset: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    pub minted_supply: u64,
}

#[event]
pub struct AssetStatusChanged {
    pub asset: Pubkey,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// エラーコード
// ---------------------------------------------------------------------------

/// プログラム固有のエラーコード。
#[error_code]
pub enum ErrorCode {
    #[msg("資産名が長すぎます")]
    NameTooLong,
    #[msg("説明が長すぎます")]
    DescriptionTooLong,
    #[msg("メタデータURIが長すぎます")]
    MetadataUriTooLong,
    #[msg("発行上限は1以上である必要があります")]
    InvalidSupply,
    #[msg("評価額は1以上である必要があります")]
    InvalidValuation,
    #[msg("資産が無効化されています")]
    AssetInactive,
    #[msg("数量は1以上である必要があります")]
    InvalidAmount,
    #[msg("発行上限を超えています")]
    SupplyExceeded,
    #[msg("資産所有者ではありません")]
    Unauthorized,
    #[msg("支払額が許容スリッページを下回っています")]
    SlippageExceeded,
    #[msg("トークン残高が不足しています")]
    InsufficientTokens,
    /// 算術オーバーフロー
    #[msg("算術オーバーフロー")]
    MathOverflow,
    /// トークンアカウントのMintが一致しない
    #[msg("トークンアカウントのMintが一致しません")]
    MintMismatch,
    /// USDCアカウントの所有者またはMintが不正
    #[msg("USDC支払いアカウントが不正です")]
    InvalidPaymentAccount,
    /// 資産アカウントのアドレスがPDAと一致しない
    #[msg("資産アカウントのアドレスが不正です")]
    InvalidAssetAddress,
}
