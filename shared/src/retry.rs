//! Retry-with-backoff wrapper for external calls.
//!
//! Retries are scoped to the single failing call, never to a whole document
//! pipeline; exhausting the budget surfaces the last error tagged with the
//! stage it came from.

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tracing::warn;

use crate::error::{EvalError, Result};

/// Fixed short backoff: 100ms doubling per attempt, capped at 800ms.
fn backoff_ms(attempt: usize) -> u64 {
    100 * (1u64 << attempt).min(8)
}

/// Run `op` up to `1 + retries` times with a per-call timeout.
pub async fn with_retry<T, F, Fut>(
    stage: &str,
    retries: usize,
    timeout_ms: u64,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<EvalError> = None;

    for attempt in 0..=retries {
        match time::timeout(Duration::from_millis(timeout_ms), op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                warn!(stage, attempt = attempt + 1, error = %e, "call failed");
                last_err = Some(e);
            }
            Err(_) => {
                warn!(stage, attempt = attempt + 1, "call timed out after {timeout_ms}ms");
                last_err = Some(EvalError::Upstream(format!("timeout after {timeout_ms}ms")));
            }
        }
        if attempt < retries {
            time::sleep(Duration::from_millis(backoff_ms(attempt))).await;
        }
    }

    Err(last_err
        .unwrap_or_else(|| EvalError::Upstream("no attempt executed".into()))
        .tagged(stage))
}
