//! Bounded retry policy for append-only writes that may meet a locked store.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub max_attempts:  u32,
  pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: 3, base_delay_ms: 200 } }
}

impl RetryPolicy {
  /// A policy that never waits, for tests.
  pub fn immediate(max_attempts: u32) -> Self { Self { max_attempts, base_delay_ms: 0 } }

  /// Pause before the next try after `attempt` (1-based) failed. Grows
  /// linearly: 200 ms, 400 ms, ...
  pub fn delay_after(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delay_grows_linearly() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_after(1), Duration::from_millis(200));
    assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    assert_eq!(RetryPolicy::immediate(5).delay_after(4), Duration::ZERO);
  }
}
