//! Time Abstractions
//!
//! Provides an injectable time source so retry backoff and polling loops can be
//! tested without real waiting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source trait
///
/// Abstracts wall-clock time and sleeping. Production code uses
/// [`SystemClock`]; tests substitute a clock that records requested sleeps and
/// returns immediately.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// async fn backoff(clock: &dyn Clock, attempt: u32) {
///     clock.sleep(Duration::from_secs(1 << attempt)).await;
/// }
/// ```
#[async_trait]
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// System clock implementation using actual system time and the tokio timer
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
