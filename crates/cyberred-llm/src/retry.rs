//! Bounded retry with exponential backoff. A `RateLimited` error's
//! `retry_after_ms` is honored verbatim instead of the computed backoff,
//! per spec.md §4.O.

use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const BASE_BACKOFF: Duration = Duration::from_millis(200);

pub async fn retry_with_backoff<F, Fut, T>(max_attempts: u32, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(LlmError::RateLimited { retry_after_ms }) => {
                tokio::time::sleep(Duration::from_millis(retry_after_ms)).await;
            }
            Err(_) => {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(DEFAULT_MAX_ATTEMPTS, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::Timeout(1))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "done");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let result: Result<String, LlmError> =
            retry_with_backoff(2, || async { Err(LlmError::Timeout(1)) }).await;
        assert!(result.is_err());
    }
}
