use alloy::primitives::Address;

use dapp_bridge_core::{
    ApprovalGrant, ChainConfig, PortError, PromptPort, Secret, SigningPrompt,
    TokenApprovalPrompt, WatchAssetOptions,
};

use crate::BridgeAdapterConfig;

const DECLINED: &str = "User rejected the request.";

/// Non-interactive prompt surface. Approves everything when `auto_approve` is set,
/// otherwise declines everything. Signing secrets come from the configured passphrase.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPromptAdapter {
    auto_approve: bool,
    passphrase: Option<String>,
}

impl ScriptedPromptAdapter {
    pub fn new(auto_approve: bool, passphrase: Option<String>) -> Self {
        Self {
            auto_approve,
            passphrase,
        }
    }

    pub fn with_config(config: &BridgeAdapterConfig) -> Self {
        Self::new(config.auto_approve, config.passphrase.clone())
    }

    fn decide(&self, what: &str) -> Result<(), PortError> {
        if self.auto_approve {
            tracing::info!(prompt = what, "auto-approved");
            Ok(())
        } else {
            tracing::info!(prompt = what, "declined");
            Err(PortError::Declined(DECLINED.to_owned()))
        }
    }

    fn secret(&self) -> Secret {
        Secret::new(self.passphrase.clone().unwrap_or_default())
    }
}

impl PromptPort for ScriptedPromptAdapter {
    async fn authorize_address_disclosure(&self, account: Address) -> Result<(), PortError> {
        tracing::debug!(%account, "address disclosure requested");
        self.decide("address disclosure")
    }

    async fn authorize_signing(&self, prompt: &SigningPrompt) -> Result<Secret, PortError> {
        let what = match prompt {
            SigningPrompt::SendTransaction { .. } => "send transaction",
            SigningPrompt::EthSign { .. } => "eth_sign",
            SigningPrompt::PersonalMessage { .. } => "personal message",
            SigningPrompt::TypedMessage { .. } => "typed message",
        };
        self.decide(what)?;
        Ok(self.secret())
    }

    async fn authorize_token_approval(
        &self,
        prompt: &TokenApprovalPrompt,
    ) -> Result<ApprovalGrant, PortError> {
        self.decide("token approval")?;
        Ok(ApprovalGrant {
            secret: self.secret(),
            amount: prompt.approval.amount,
        })
    }

    async fn authorize_chain_add(&self, config: &ChainConfig) -> Result<(), PortError> {
        tracing::debug!(chain_id = %config.chain_id, name = %config.chain_name, "chain add requested");
        self.decide("chain add")
    }

    async fn authorize_chain_switch(
        &self,
        prev: &ChainConfig,
        next: &ChainConfig,
    ) -> Result<(), PortError> {
        tracing::debug!(from = %prev.chain_id, to = %next.chain_id, "chain switch requested");
        self.decide("chain switch")
    }

    async fn authorize_watch_asset(&self, asset: &WatchAssetOptions) -> Result<(), PortError> {
        tracing::debug!(token = %asset.address, symbol = %asset.symbol, "watch asset requested");
        self.decide("watch asset")
    }

    async fn transaction_finished(&self, error: Option<&str>) {
        match error {
            Some(error) => tracing::warn!(error, "transaction failed"),
            None => tracing::info!("transaction finished"),
        }
    }
}
