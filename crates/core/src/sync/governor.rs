//! Call-count cooldown for the remote catalog.
//!
//! The governor counts calls made since the last cooldown. Once the count
//! reaches the threshold the caller is suspended for the cooldown and the
//! count starts over. It is owned by a single sequential caller, so there is
//! no locking.

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::GovernorConfig;
use crate::metrics;

/// Result of a governed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Below threshold, no pause.
    Immediate,
    /// Threshold reached, the cooldown was served.
    AfterCooldown,
    /// Shutdown was requested during the cooldown.
    Cancelled,
}

pub struct RateGovernor {
    threshold: u32,
    cooldown: Duration,
    calls: u32,
}

impl RateGovernor {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            calls: 0,
        }
    }

    pub fn from_config(config: &GovernorConfig) -> Self {
        Self::new(config.threshold, Duration::from_millis(config.cooldown_ms))
    }

    /// Calls counted since the last cooldown.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count one call and pause if the threshold is reached.
    ///
    /// With a threshold of N, calls 1 to N-1 pass immediately and the N-th
    /// call itself serves the cooldown before returning.
    /// The counter is reset before the pause starts, so a cancelled cooldown
    /// still leaves the governor at zero.
    pub async fn check_and_maybe_pause(&mut self, label: &str, cancel: &CancellationToken) -> Admission {
        self.calls += 1;
        if self.calls < self.threshold {
            debug!(label, calls = self.calls, threshold = self.threshold, "Governed call");
            return Admission::Immediate;
        }

        self.calls = 0;
        metrics::GOVERNOR_COOLDOWNS.inc();
        info!(
            label,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Call threshold reached, cooling down"
        );

        tokio::select! {
            _ = cancel.cancelled() => Admission::Cancelled,
            _ = tokio::time::sleep(self.cooldown) => Admission::AfterCooldown,
        }
    }
}
