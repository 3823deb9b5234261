//! # 価格計算・単位変換・表示フォーマット
//!
//! 金額はオンチェーンではu64の最小単位で扱い、表示用にのみf64へ変換する。
//! 購入見積もり（`quote_purchase`）はオンチェーンと同じ整数演算で行う。

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::constants::{LAMPORTS_PER_SOL, SLIPPAGE_TOLERANCE_PCT, TOKEN_DECIMALS};
use crate::error::SdkError;

/// lamports → SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// SOL → lamports（端数切り捨て）
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).floor() as u64
}

/// 最小単位のトークン量 → 表示単位
pub fn token_amount_to_number(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

/// 表示単位 → 最小単位のトークン量（端数切り捨て、負数は0）
pub fn number_to_token_amount(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)).floor() as u64
}

/// 10進数の文字列 → 最小単位のトークン量。浮動小数点を経由せずに変換する。
///
/// 小数部が `decimals` 桁を超える入力、符号付きの入力、u64に収まらない入力はエラー。
pub fn parse_token_amount(input: &str, decimals: u8) -> Result<u64, SdkError> {
    let s = input.trim();
    let invalid = || SdkError::InvalidInput(format!("数量の形式が不正です: {input}"));

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(int_part) || !is_digits(frac_part) {
        return Err(invalid());
    }
    let width = decimals as usize;
    if frac_part.len() > width {
        return Err(SdkError::InvalidInput(format!(
            "小数部は{decimals}桁以下である必要があります: {input}"
        )));
    }

    let too_large = || SdkError::InvalidInput(format!("数量が大きすぎます: {input}"));
    let int_value: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| too_large())?
    };
    let frac_value: u64 = if width == 0 {
        0
    } else {
        format!("{frac_part:0<width$}").parse().map_err(|_| invalid())?
    };
    10u64
        .checked_pow(decimals as u32)
        .and_then(|scale| int_value.checked_mul(scale))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(too_large)
}

/// 1トークンあたりの価格（USDC）。発行上限が0なら0。
pub fn calculate_token_price(valuation: u64, total_supply: u64) -> f64 {
    if total_supply == 0 {
        return 0.0;
    }
    token_amount_to_number(valuation, TOKEN_DECIMALS)
        / token_amount_to_number(total_supply, TOKEN_DECIMALS)
}

/// 時価総額（USDC）
pub fn calculate_market_cap(token_price: f64, total_supply: u64) -> f64 {
    token_price * token_amount_to_number(total_supply, TOKEN_DECIMALS)
}

/// 未発行のトークン数（表示単位）
pub fn calculate_available_supply(total_supply: u64, minted_supply: u64) -> f64 {
    token_amount_to_number(total_supply.saturating_sub(minted_supply), TOKEN_DECIMALS)
}

/// 購入見積もり。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseQuote {
    /// 購入するトークン量（最小単位）
    pub tokens: u64,
    /// 基準支払額（USDC最小単位）
    pub usdc_amount: u64,
    /// プログラムが受け入れる最低支払額（USDC最小単位）
    pub min_usdc_amount: u64,
}

/// `tokens` の購入に必要なUSDCを見積もる。
///
/// オンチェーンの `buy_fraction` と同じく `tokens * valuation / total_supply` を
/// u128で計算し、最低支払額はそこから1%のスリッページを差し引いた値。
pub fn quote_purchase(
    valuation: u64,
    total_supply: u64,
    tokens: u64,
) -> Result<PurchaseQuote, SdkError> {
    if total_supply == 0 {
        return Err(SdkError::InvalidInput("発行上限が0の資産は購入できません".to_string()));
    }
    let exact = (tokens as u128) * (valuation as u128) / (total_supply as u128);
    let usdc_amount = u64::try_from(exact)
        .map_err(|_| SdkError::InvalidInput(format!("支払額がu64を超えます: {exact}")))?;
    let min = (usdc_amount as u128) * (100 - SLIPPAGE_TOLERANCE_PCT) as u128 / 100;

    Ok(PurchaseQuote {
        tokens,
        usdc_amount,
        min_usdc_amount: min as u64,
    })
}

/// Base58の公開鍵として解釈できるかどうか。
pub fn is_valid_public_key(address: &str) -> bool {
    Pubkey::from_str(address).is_ok()
}

/// 3桁区切り（en-US）で数値をフォーマットする。
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // 丸めた結果が0なら符号を付けない
    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// USD表記でフォーマットする（例: `$1,234.56`、`-$5.00`）。
pub fn format_currency(amount: f64) -> String {
    let body = format_number(amount.abs(), 2);
    if amount < 0.0 && body != "0.00" {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// アドレスを先頭・末尾 `chars` 文字に短縮する（例: `1111...1112`）。
pub fn truncate_address(address: &str, chars: usize) -> String {
    let len = address.chars().count();
    if len <= chars * 2 {
        return address.to_string();
    }
    let head: String = address.chars().take(chars).collect();
    let tail: String = address.chars().skip(len - chars).collect();
    format!("{head}...{tail}")
}
