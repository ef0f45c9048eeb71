//! Peer configuration types

use std::time::Duration;

use crate::common::DisconnectCause;
use crate::entity::DiameterEntity;
use crate::error::{DiameterError, DiameterResult};

/// Smallest permitted watchdog interval (RFC 3539 Section 3.4.1)
pub const WATCHDOG_INTERVAL_FLOOR: Duration = Duration::from_secs(6);

/// Default watchdog interval
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for one peer state machine
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// The local node's identity, sent in CER/CEA
    pub identity: DiameterEntity,

    /// Base watchdog interval Tw; each armed expiry adds a random jitter
    pub watchdog_interval: Duration,

    /// Disconnect-Cause sent in a locally initiated DPR
    pub disconnect_cause: DisconnectCause,
}

impl PeerConfig {
    pub fn new(identity: DiameterEntity) -> Self {
        Self {
            identity,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            disconnect_cause: DisconnectCause::DoNotWantToTalkToYou,
        }
    }

    /// Set the watchdog interval. Intervals below the RFC 3539 floor of
    /// 6 seconds are rejected.
    pub fn with_watchdog_interval(mut self, interval: Duration) -> DiameterResult<Self> {
        if interval < WATCHDOG_INTERVAL_FLOOR {
            return Err(DiameterError::InvalidConfiguration(format!(
                "watchdog interval must be at least {} seconds",
                WATCHDOG_INTERVAL_FLOOR.as_secs()
            )));
        }
        self.watchdog_interval = interval;
        Ok(self)
    }

    /// Set the Disconnect-Cause used for locally initiated disconnects
    pub fn with_disconnect_cause(mut self, cause: DisconnectCause) -> Self {
        self.disconnect_cause = cause;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> DiameterEntity {
        DiameterEntity::new(
            "node.example.com",
            "example.com",
            vec!["127.0.0.1".parse().unwrap()],
            0,
            "rust-diameter",
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = PeerConfig::new(test_identity());
        assert_eq!(config.watchdog_interval, DEFAULT_WATCHDOG_INTERVAL);
        assert_eq!(config.disconnect_cause, DisconnectCause::DoNotWantToTalkToYou);
    }

    #[test]
    fn test_watchdog_floor_enforced() {
        let config = PeerConfig::new(test_identity());
        assert!(matches!(
            config.clone().with_watchdog_interval(Duration::from_secs(5)),
            Err(DiameterError::InvalidConfiguration(_))
        ));

        let config = config
            .with_watchdog_interval(Duration::from_secs(6))
            .unwrap();
        assert_eq!(config.watchdog_interval, Duration::from_secs(6));
    }
}
