//! Broker connection settings.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::BrokerError;

/// Where and how to reach the messaging broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address. Default: `127.0.0.1`.
    pub host: String,

    /// Broker port. Default: 1883.
    pub port: u16,

    /// Prefix of the client identifier; the connect time is appended.
    pub client_prefix: String,

    /// MQTT keep-alive interval. Default: 30 seconds.
    pub keep_alive: Duration,

    /// Capacity of the request channel between client and event loop.
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_prefix: "portcullis".to_string(),
            keep_alive: Duration::from_secs(30),
            channel_capacity: 10,
        }
    }
}

impl BrokerConfig {
    /// Default settings pointed at a different port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Checks the settings the MQTT client would otherwise panic on.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.host.trim().is_empty() {
            return Err(BrokerError::InvalidConfig("host is empty".into()));
        }
        if self.port == 0 {
            return Err(BrokerError::InvalidConfig("port must not be 0".into()));
        }
        if self.client_prefix.is_empty() || self.client_prefix.starts_with(char::is_whitespace) {
            return Err(BrokerError::InvalidConfig(
                "client prefix must be non-empty and not start with whitespace".into(),
            ));
        }
        if self.keep_alive < Duration::from_secs(1) {
            return Err(BrokerError::InvalidConfig(
                "keep-alive must be at least one second".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(BrokerError::InvalidConfig(
                "channel capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Client identifier for a connection made at `at`:
    /// `<prefix>:<unix seconds, 6 decimals>`.
    pub fn client_id(&self, at: SystemTime) -> String {
        let secs = at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        format!("{}:{secs:.6}", self.client_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_local_broker() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 1883);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_client_id_appends_connect_time() {
        let cfg = BrokerConfig::default();
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_250);
        assert_eq!(cfg.client_id(at), "portcullis:1700000000.250000");
    }

    #[test]
    fn test_client_id_differs_over_time() {
        let cfg = BrokerConfig::default();
        let t = UNIX_EPOCH + Duration::from_secs(10);
        assert_ne!(cfg.client_id(t), cfg.client_id(t + Duration::from_micros(5)));
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        let bad = [
            BrokerConfig {
                host: " ".into(),
                ..Default::default()
            },
            BrokerConfig::with_port(0),
            BrokerConfig {
                client_prefix: String::new(),
                ..Default::default()
            },
            BrokerConfig {
                client_prefix: " lead".into(),
                ..Default::default()
            },
            BrokerConfig {
                keep_alive: Duration::ZERO,
                ..Default::default()
            },
            BrokerConfig {
                channel_capacity: 0,
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(BrokerError::InvalidConfig(_))),
                "{cfg:?} should be rejected"
            );
        }
    }
}
