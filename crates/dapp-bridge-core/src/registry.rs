use crate::domain::{ChainConfig, ChainId};
use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchPlan {
    /// Target is already selected; nothing to authorize.
    AlreadySelected,
    /// Authorization is required before `commit_switch`.
    Required {
        prev: ChainConfig,
        next: ChainConfig,
    },
}

/// Known chain configurations plus the selected one. The selection is an index into
/// `list`, so it can never dangle.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    list: Vec<ChainConfig>,
    selected: usize,
    pending_switch: Option<ChainId>,
}

impl ChainRegistry {
    pub fn new(bootstrap: ChainConfig) -> Self {
        Self {
            list: vec![bootstrap],
            selected: 0,
            pending_switch: None,
        }
    }

    pub fn with_chains(bootstrap: ChainConfig, others: impl IntoIterator<Item = ChainConfig>) -> Self {
        let mut registry = Self::new(bootstrap);
        for config in others {
            registry.add(config);
        }
        registry
    }

    pub fn list(&self) -> &[ChainConfig] {
        &self.list
    }

    pub fn selected(&self) -> &ChainConfig {
        &self.list[self.selected]
    }

    pub fn find(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.list.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn contains(&self, chain_id: ChainId) -> bool {
        self.find(chain_id).is_some()
    }

    pub fn pending_switch(&self) -> Option<ChainId> {
        self.pending_switch
    }

    /// Appends `config` unless its chain id is already known. Returns whether it was added.
    pub fn add(&mut self, config: ChainConfig) -> bool {
        if self.contains(config.chain_id) {
            return false;
        }
        self.list.push(config);
        true
    }

    /// Starts a switch. Returns immediately with no side effect when `target` is already
    /// selected; otherwise reserves the single pending-switch slot until the switch is
    /// committed or aborted.
    pub fn switch_to(&mut self, target: ChainId) -> Result<SwitchPlan, BridgeError> {
        if self.selected().chain_id == target {
            return Ok(SwitchPlan::AlreadySelected);
        }
        let next = self
            .find(target)
            .cloned()
            .ok_or(BridgeError::UnknownChain(target))?;
        if let Some(pending) = self.pending_switch {
            return Err(BridgeError::SwitchPending(pending));
        }
        self.pending_switch = Some(target);
        Ok(SwitchPlan::Required {
            prev: self.selected().clone(),
            next,
        })
    }

    pub fn commit_switch(&mut self, target: ChainId) -> Result<&ChainConfig, BridgeError> {
        let idx = self
            .list
            .iter()
            .position(|c| c.chain_id == target)
            .ok_or(BridgeError::UnknownChain(target))?;
        if self.pending_switch == Some(target) {
            self.pending_switch = None;
        }
        self.selected = idx;
        Ok(&self.list[idx])
    }

    pub fn abort_switch(&mut self, target: ChainId) {
        if self.pending_switch == Some(target) {
            self.pending_switch = None;
        }
    }
}
