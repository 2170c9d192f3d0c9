//! Bounded retry of writes that hit a locked database.

use std::future::Future;

use convoca_core::retry::RetryPolicy;

use crate::{Error, Result};

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up. Exhaustion surfaces as
/// [`convoca_core::Error::TransientStore`].
pub(crate) async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    match op().await {
      Err(e) if e.is_transient() => {
        if attempt >= max_attempts {
          tracing::error!(error = %e, attempts = attempt, "{label}: store still locked, giving up");
          return Err(convoca_core::Error::TransientStore { attempts: attempt }.into());
        }
        let delay = policy.delay_after(attempt);
        tracing::warn!(error = %e, attempt, ?delay, "{label}: store locked, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      other => return other,
    }
  }
}
