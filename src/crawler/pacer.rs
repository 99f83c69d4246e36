//! Request pacing
//!
//! Pure delays between requests: a short jittered pause after every page,
//! a long pause after a burst of discoveries, and a cooldown between
//! groups of events. No retry logic lives here.

use crate::config::{DelayRange, PacingConfig};
use async_trait::async_trait;

/// Pacing capability awaited by the paginator and the orchestrator
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Short delay after every page fetch
    async fn pace(&self);

    /// Long delay once enough new results accumulated
    async fn long_pause(&self);

    /// Delay between groups of parent units
    async fn cooldown(&self);
}

/// Jittered delays drawn from the configured ranges
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    page_delay: DelayRange,
    pause_delay: DelayRange,
    cooldown_delay: DelayRange,
}

impl BackoffPolicy {
    pub fn new(page_delay: DelayRange, pause_delay: DelayRange, cooldown_delay: DelayRange) -> Self {
        Self {
            page_delay,
            pause_delay,
            cooldown_delay,
        }
    }

    pub fn from_config(config: &PacingConfig) -> Self {
        Self::new(config.page_delay, config.pause_delay, config.cooldown_delay)
    }

    /// Policy that never sleeps
    pub fn none() -> Self {
        Self::new(DelayRange::zero(), DelayRange::zero(), DelayRange::zero())
    }
}

#[async_trait]
impl Pacer for BackoffPolicy {
    async fn pace(&self) {
        tokio::time::sleep(self.page_delay.sample()).await;
    }

    async fn long_pause(&self) {
        let delay = self.pause_delay.sample();
        tracing::info!("Taking a long pause of {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
    }

    async fn cooldown(&self) {
        let delay = self.cooldown_delay.sample();
        tracing::debug!("Cooling down for {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_pace_sleeps_within_range() {
        let policy = BackoffPolicy::new(
            DelayRange::new(20, 40),
            DelayRange::zero(),
            DelayRange::zero(),
        );

        let start = Instant::now();
        policy.pace().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_none_policy_does_not_sleep() {
        let policy = BackoffPolicy::none();
        let start = Instant::now();
        policy.pace().await;
        policy.long_pause().await;
        policy.cooldown().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_from_config() {
        let config = PacingConfig::default();
        let policy = BackoffPolicy::from_config(&config);
        assert_eq!(policy.page_delay, DelayRange::new(3_000, 5_000));
        assert_eq!(policy.pause_delay, DelayRange::new(180_000, 240_000));
    }
}
