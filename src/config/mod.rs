// nexus_core/src/config/mod.rs
//
// §6 "Configuration", §10.3: per-process settings for the exchange and
// the trading client, loaded from TOML and overridable from the CLI in
// each binary. Deliberately thin — everything here is either a network
// endpoint or a risk limit; nothing in this module touches the hot
// path.

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::risk::RiskLimits;
use crate::types::{ClientId, Price, Qty, TickerId};

/// One multicast group/port pair (§6 "Transports").
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct McastEndpoint {
    pub group: Ipv4Addr,
    pub port: u16,
}

/// Exchange-process configuration: the network interface, both
/// multicast streams, and the TCP bind address for the order server.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub interface: Ipv4Addr,
    pub tcp_bind_addr: String,
    pub incremental: McastEndpoint,
    pub snapshot: McastEndpoint,
    #[serde(default = "default_snapshot_interval_ns")]
    pub snapshot_interval_ns: u64,
    #[serde(default = "default_tickers")]
    pub tickers: Vec<TickerId>,
}

fn default_snapshot_interval_ns() -> u64 {
    60_000_000_000
}

fn default_tickers() -> Vec<TickerId> {
    vec![0]
}

impl ExchangeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }
}

/// Trading-client configuration: the network interface, both multicast
/// streams (incremental always joined, snapshot joined only while in
/// recovery per §4.9), the TCP address to connect to, and per-ticker
/// risk limits (§4.11 — consumed by the strategy, not the core).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: ClientId,
    pub interface: Ipv4Addr,
    pub tcp_connect_addr: String,
    pub incremental: McastEndpoint,
    pub snapshot: McastEndpoint,
    #[serde(default)]
    pub risk: Vec<TickerRiskLimits>,
}

/// One ticker's risk limits, as they appear in the TOML `[[risk]]`
/// array-of-tables.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TickerRiskLimits {
    pub ticker: TickerId,
    pub max_order_size: Qty,
    pub max_position: i64,
    pub max_loss: Price,
}

impl From<TickerRiskLimits> for RiskLimits {
    fn from(t: TickerRiskLimits) -> Self {
        RiskLimits {
            max_order_size: t.max_order_size,
            max_position: t.max_position,
            max_loss: t.max_loss,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn risk_limits_for(&self, ticker: TickerId) -> Option<RiskLimits> {
        self.risk.iter().find(|r| r.ticker == ticker).copied().map(RiskLimits::from)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_config_parses_minimal_toml() {
        let toml = r#"
            interface = "127.0.0.1"
            tcp_bind_addr = "0.0.0.0:12345"

            [incremental]
            group = "239.0.0.1"
            port = 20000

            [snapshot]
            group = "239.0.0.2"
            port = 20001
        "#;
        let cfg = ExchangeConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.tcp_bind_addr, "0.0.0.0:12345");
        assert_eq!(cfg.snapshot_interval_ns, default_snapshot_interval_ns());
        assert_eq!(cfg.tickers, vec![0]);
    }

    #[test]
    fn client_config_parses_risk_limits_array() {
        let toml = r#"
            client_id = 1
            interface = "127.0.0.1"
            tcp_connect_addr = "127.0.0.1:12345"

            [incremental]
            group = "239.0.0.1"
            port = 20000

            [snapshot]
            group = "239.0.0.2"
            port = 20001

            [[risk]]
            ticker = 0
            max_order_size = 100
            max_position = 500
            max_loss = 1000000000000
        "#;
        let cfg = ClientConfig::from_toml_str(toml).unwrap();
        let limits = cfg.risk_limits_for(0).unwrap();
        assert_eq!(limits.max_position, 500);
        assert!(cfg.risk_limits_for(1).is_none());
    }
}
