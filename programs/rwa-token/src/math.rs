//! 価格計算と検査付き算術。

use anchor_lang::prelude::*;

use crate::ErrorCode;

/// 購入時に許容するスリッページ（パーセント）
pub const SLIPPAGE_TOLERANCE_PCT: u64 = 1;

pub fn checked_add(a: u64, b: u64) -> Result<u64> {
    match a.checked_add(b) {
        Some(v) => Ok(v),
        None => {
            msg!("Error: Overflow in {} + {}", a, b);
            err!(ErrorCode::MathOverflow)
        }
    }
}

pub fn checked_sub(a: u64, b: u64) -> Result<u64> {
    match a.checked_sub(b) {
        Some(v) => Ok(v),
        None => {
            msg!("Error: Overflow in {} - {}", a, b);
            err!(ErrorCode::MathOverflow)
        }
    }
}

/// `tokens` 分のトークンに対する基準支払額（USDC最小単位）を計算する。
///
/// `tokens * valuation / total_supply` をu128で計算し、端数は切り捨てる。
pub fn expected_payment(tokens: u64, valuation: u64, total_supply: u64) -> Result<u64> {
    if total_supply == 0 {
        msg!("Error: total_supply is zero");
        return err!(ErrorCode::MathOverflow);
    }
    let value = (tokens as u128) * (valuation as u128) / (total_supply as u128);
    u64::try_from(value).map_err(|_| {
        msg!("Error: Overflow in {} * {} / {}", tokens, valuation, total_supply);
        error!(ErrorCode::MathOverflow)
    })
}

/// スリッページ許容後の最低支払額。
pub fn min_accepted_payment(expected: u64) -> Result<u64> {
    let value = (expected as u128) * (100 - SLIPPAGE_TOLERANCE_PCT) as u128 / 100;
    // expected以下なのでu64に収まる
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(checked_add(1, 2).unwrap(), 3);
        assert!(checked_add(u64::MAX, 1).is_err());
    }

    #[test]
    fn test_checked_sub_underflow() {
        assert_eq!(checked_sub(5, 2).unwrap(), 3);
        assert!(checked_sub(2, 5).is_err());
    }

    #[test]
    fn test_expected_payment() {
        // 評価額 1,000,000 USDC / 発行上限 1,000,000トークン → 1トークン = 1 USDC
        let valuation = 1_000_000 * 1_000_000;
        let supply = 1_000_000 * 1_000_000;
        assert_eq!(expected_payment(100, valuation, supply).unwrap(), 100);

        // 単価が1未満でも0に丸めない
        assert_eq!(expected_payment(10, 1, 4).unwrap(), 2);
    }

    #[test]
    fn test_expected_payment_large_values() {
        // u64同士の積がu64を超えてもu128で計算される
        let v = expected_payment(u64::MAX / 2, u64::MAX / 2, u64::MAX / 2).unwrap();
        assert_eq!(v, u64::MAX / 2);

        // 結果がu64に収まらなければエラー
        assert!(expected_payment(u64::MAX, u64::MAX, 1).is_err());
    }

    #[test]
    fn test_expected_payment_zero_supply() {
        assert!(expected_payment(1, 1, 0).is_err());
    }

    #[test]
    fn test_min_accepted_payment() {
        assert_eq!(min_accepted_payment(100).unwrap(), 99);
        assert_eq!(min_accepted_payment(1_000_000).unwrap(), 990_000);
        assert_eq!(min_accepted_payment(0).unwrap(), 0);
        assert_eq!(min_accepted_payment(u64::MAX).unwrap(), (u64::MAX as u128 * 99 / 100) as u64);
    }
}
