//! # 指数バックオフ付きリトライ
//!
//! i回目の失敗後に `base_delay * 2^i` 待機して再試行する。
//! 最後の試行の後は待機せず、最後のエラーを返す。
//! 失敗はすべて `tracing::warn!` で記録する。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::constants::MAX_RETRIES;

/// リトライ方針。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（0は1として扱う）
    pub max_retries: u32,
    /// 初回の待機時間
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// i回目（0始まり）の失敗後の待機時間
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// 全てのエラーでリトライする。
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_when(policy, op, |_| true).await
}

/// `should_retry` がtrueを返すエラーのみリトライする。
pub async fn retry_when<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if !should_retry(&e) {
                    tracing::warn!(attempt, error = %e, "リトライ対象外のエラーです");
                    return Err(e);
                }
                if attempt >= attempts {
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "リトライ上限に達しました"
                    );
                    return Err(e);
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "処理に失敗しました。リトライします"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
