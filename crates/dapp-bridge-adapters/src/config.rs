use std::str::FromStr;
use std::time::Duration;

use dapp_bridge_core::{
    BridgeOptions, ChainConfig, ChainId, HardwareOptions, NativeCurrency, PollPolicy,
};

#[derive(Debug, Clone)]
pub struct BridgeAdapterConfig {
    pub allow_eth_sign: bool,
    pub is_debug: bool,
    pub rpc_timeout_ms: u64,
    pub hw_poll_interval_ms: u64,
    pub hw_poll_max_attempts: u32,
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub chain_name: String,
    /// Derivation index of the account exposed to dapps.
    pub account_index: u32,
    pub auto_approve: bool,
    pub passphrase: Option<String>,
    /// Key material for the development signer. Never use with real funds.
    pub signer_seed: String,
}

impl Default for BridgeAdapterConfig {
    fn default() -> Self {
        Self {
            allow_eth_sign: false,
            is_debug: false,
            rpc_timeout_ms: 15_000,
            hw_poll_interval_ms: 100,
            hw_poll_max_attempts: 600,
            chain_id: ChainId(25),
            rpc_url: "https://evm.cronos.org".to_owned(),
            chain_name: "Cronos".to_owned(),
            account_index: 0,
            auto_approve: false,
            passphrase: None,
            signer_seed: "dapp-bridge development seed".to_owned(),
        }
    }
}

impl BridgeAdapterConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            allow_eth_sign: env_flag("DAPP_BRIDGE_ALLOW_ETH_SIGN", defaults.allow_eth_sign),
            is_debug: env_flag("DAPP_BRIDGE_DEBUG", defaults.is_debug),
            rpc_timeout_ms: env_parse("DAPP_BRIDGE_RPC_TIMEOUT_MS", defaults.rpc_timeout_ms),
            hw_poll_interval_ms: env_parse(
                "DAPP_BRIDGE_HW_POLL_INTERVAL_MS",
                defaults.hw_poll_interval_ms,
            ),
            hw_poll_max_attempts: env_parse(
                "DAPP_BRIDGE_HW_POLL_MAX_ATTEMPTS",
                defaults.hw_poll_max_attempts,
            ),
            chain_id: env_parse("DAPP_BRIDGE_CHAIN_ID", defaults.chain_id),
            rpc_url: env_string("DAPP_BRIDGE_RPC_URL").unwrap_or(defaults.rpc_url),
            chain_name: env_string("DAPP_BRIDGE_CHAIN_NAME").unwrap_or(defaults.chain_name),
            account_index: env_parse("DAPP_BRIDGE_ACCOUNT", defaults.account_index),
            auto_approve: env_flag("DAPP_BRIDGE_AUTO_APPROVE", defaults.auto_approve),
            passphrase: env_string("DAPP_BRIDGE_PASSPHRASE"),
            signer_seed: env_string("DAPP_BRIDGE_SIGNER_SEED").unwrap_or(defaults.signer_seed),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            allow_eth_sign: self.allow_eth_sign,
            is_debug: self.is_debug,
            account_index: self.account_index,
            hardware: HardwareOptions {
                poll: PollPolicy {
                    interval: Duration::from_millis(self.hw_poll_interval_ms),
                    max_attempts: self.hw_poll_max_attempts,
                },
                ..HardwareOptions::default()
            },
            ..BridgeOptions::default()
        }
    }

    pub fn bootstrap_chain(&self) -> ChainConfig {
        ChainConfig {
            chain_id: self.chain_id,
            rpc_urls: vec![self.rpc_url.clone()],
            chain_name: self.chain_name.clone(),
            native_currency: NativeCurrency {
                name: "Cronos".to_owned(),
                symbol: "CRO".to_owned(),
                decimals: 18,
            },
            block_explorer_urls: vec![],
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_string(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            tracing::warn!(name, value = %v, "unrecognized boolean; using default");
            default
        }
        None => default,
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env_string(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(name, value = %raw, "invalid value; using default");
            default
        }),
        None => default,
    }
}
