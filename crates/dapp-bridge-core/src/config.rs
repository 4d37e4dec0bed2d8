use std::time::Duration;

use crate::family::DerivationStandard;
use crate::hardware::{classify_device_error, HardwareErrorKind};

/// Failure texts that mean "device reachable, wrong app open or device locked".
pub const DEFAULT_CONDITION_PATTERNS: &[&str] = &[
    "conditions of use not satisfied",
    "0x6985",
    "0x6e00",
    "0x6e01",
    "0x6511",
    "0x5515",
    "locked device",
    "device is locked",
    "wrong app",
    "app does not seem to be open",
    "cla_not_supported",
    "ins_not_supported",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 600,
        }
    }
}

impl PollPolicy {
    /// Upper bound on time spent waiting for an app switch.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct HardwareOptions {
    pub poll: PollPolicy,
    pub condition_patterns: Vec<String>,
}

impl Default for HardwareOptions {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            condition_patterns: DEFAULT_CONDITION_PATTERNS
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

impl HardwareOptions {
    pub fn classify(&self, message: &str) -> HardwareErrorKind {
        classify_device_error(message, &self.condition_patterns)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    pub allow_eth_sign: bool,
    pub is_debug: bool,
    /// Derivation index of the account exposed to dapps.
    pub account_index: u32,
    pub derivation_standard: DerivationStandard,
    pub hardware: HardwareOptions,
}
