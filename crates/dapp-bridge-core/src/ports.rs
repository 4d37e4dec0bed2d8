use alloy::primitives::{Address, Bytes, B256};
use thiserror::Error;

use crate::domain::{
    ApprovalGrant, ChainConfig, FeeEstimate, FeeQuery, Secret, SigningPrompt, TokenApprovalPrompt,
    TokenMetadata, UnsignedEvmTransaction, WalletAsset, WatchAssetOptions,
};
use crate::family::DerivationStandard;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("declined: {0}")]
    Declined(String),
    /// Raw failure text reported by a hardware device.
    #[error("{0}")]
    Device(String),
}

/// Produces addresses and signatures. Hardware-backed implementations expose one
/// asset-family app at a time and report failures as `PortError::Device`.
#[allow(async_fn_in_trait)]
pub trait SignerPort {
    fn is_hardware(&self) -> bool;

    async fn get_address(
        &self,
        index: u32,
        address_prefix: &str,
        standard: DerivationStandard,
        confirm_on_device: bool,
    ) -> Result<String, PortError>;

    async fn get_eth_address(
        &self,
        index: u32,
        standard: DerivationStandard,
        confirm_on_device: bool,
    ) -> Result<Address, PortError>;

    async fn get_address_list(
        &self,
        start: u32,
        count: u32,
        address_prefix: &str,
        standard: DerivationStandard,
    ) -> Result<Vec<String>, PortError>;

    async fn get_eth_address_list(
        &self,
        start: u32,
        count: u32,
        standard: DerivationStandard,
    ) -> Result<Vec<Address>, PortError>;

    async fn get_pub_key(
        &self,
        index: u32,
        standard: DerivationStandard,
        confirm_on_device: bool,
    ) -> Result<Bytes, PortError>;

    async fn sign_transaction(
        &self,
        chain: &ChainConfig,
        transaction: &UnsignedEvmTransaction,
        secret: &Secret,
    ) -> Result<Bytes, PortError>;

    async fn sign_message(
        &self,
        account: Address,
        data: &[u8],
        secret: &Secret,
    ) -> Result<Bytes, PortError>;

    async fn sign_personal_message(
        &self,
        account: Address,
        data: &[u8],
        secret: &Secret,
    ) -> Result<Bytes, PortError>;

    async fn sign_typed_data_v4(
        &self,
        account: Address,
        typed_data: &str,
        secret: &Secret,
    ) -> Result<Bytes, PortError>;

    async fn ec_recover(&self, message: &[u8], signature: &Bytes) -> Result<Address, PortError>;
}

#[allow(async_fn_in_trait)]
pub trait ChainDataPort {
    async fn estimate_fee(
        &self,
        chain: &ChainConfig,
        query: &FeeQuery,
    ) -> Result<FeeEstimate, PortError>;

    async fn next_nonce(&self, address: Address, chain: &ChainConfig) -> Result<u64, PortError>;

    async fn token_metadata(
        &self,
        chain: &ChainConfig,
        token: Address,
    ) -> Result<TokenMetadata, PortError>;

    async fn send_raw_transaction(
        &self,
        chain: &ChainConfig,
        raw: &Bytes,
    ) -> Result<B256, PortError>;
}

/// Interactive authorization. A user refusal is `PortError::Declined`.
#[allow(async_fn_in_trait)]
pub trait PromptPort {
    async fn authorize_address_disclosure(&self, account: Address) -> Result<(), PortError>;

    async fn authorize_signing(&self, prompt: &SigningPrompt) -> Result<Secret, PortError>;

    async fn authorize_token_approval(
        &self,
        prompt: &TokenApprovalPrompt,
    ) -> Result<ApprovalGrant, PortError>;

    async fn authorize_chain_add(&self, config: &ChainConfig) -> Result<(), PortError>;

    async fn authorize_chain_switch(
        &self,
        prev: &ChainConfig,
        next: &ChainConfig,
    ) -> Result<(), PortError>;

    async fn authorize_watch_asset(&self, asset: &WatchAssetOptions) -> Result<(), PortError>;

    async fn transaction_finished(&self, error: Option<&str>);
}

#[allow(async_fn_in_trait)]
pub trait PersistencePort {
    async fn save_assets(&self, assets: &[WalletAsset]) -> Result<(), PortError>;
}

/// Script-execution primitive of the embedded content view.
pub trait ContentViewPort {
    fn execute_script(&self, script: &str) -> Result<(), PortError>;
}
