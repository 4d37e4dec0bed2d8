#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;

use dapp_bridge_core::{
    ApprovalGrant, BridgeOptions, BridgeOrchestrator, ChainConfig, ChainDataPort, ChainId,
    ChainRegistry, ContentViewPort, DerivationStandard, FeeEstimate, FeeQuery, NativeCurrency,
    PersistencePort, PortError, PromptPort, Secret, SignerPort, SigningPrompt, TokenApprovalPrompt,
    TokenMetadata, UnsignedEvmTransaction, WalletAsset, WatchAssetOptions, CHANNEL_NAME,
};

pub const WRONG_APP: &str =
    "TransportStatusError: Ledger device: Conditions of use not satisfied (denied by the user?) (0x6985)";
pub const DISCONNECTED: &str = "DisconnectedDeviceDuringOperation: The device was disconnected.";

pub fn account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid account")
}

pub fn token() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid token")
}

pub fn spender() -> Address {
    "0x000000000000000000000000000000000000cafe"
        .parse()
        .expect("valid spender")
}

pub fn chain(id: u64, name: &str, rpc: &str) -> ChainConfig {
    ChainConfig {
        chain_id: ChainId(id),
        rpc_urls: vec![rpc.to_owned()],
        chain_name: name.to_owned(),
        native_currency: NativeCurrency {
            name: "Cronos".to_owned(),
            symbol: "CRO".to_owned(),
            decimals: 18,
        },
        block_explorer_urls: vec![],
    }
}

pub fn cronos() -> ChainConfig {
    chain(0x19, "Cronos", "https://evm.cronos.org")
}

pub fn cronos_testnet() -> ChainConfig {
    chain(0x152, "Cronos Testnet", "https://evm-t3.cronos.org")
}

/// Signer whose device behavior is scripted per call.
#[derive(Debug, Default)]
pub struct FakeSigner {
    pub hardware: bool,
    /// Failures returned by successive `get_eth_address` calls before it succeeds.
    pub eth_failures: Mutex<VecDeque<String>>,
    /// Returned by every `get_eth_address` call once the queue is drained.
    pub eth_failure: Mutex<Option<String>>,
    pub tendermint_failure: Mutex<Option<String>>,
    pub sign_failure: Mutex<Option<String>>,
    pub eth_calls: AtomicUsize,
    pub tendermint_calls: AtomicUsize,
    pub signed: Mutex<Vec<UnsignedEvmTransaction>>,
    pub signed_messages: AtomicUsize,
}

impl FakeSigner {
    pub fn software() -> Self {
        Self::default()
    }

    pub fn hardware() -> Self {
        Self {
            hardware: true,
            ..Self::default()
        }
    }

    pub fn fail_eth_times(self, message: &str, times: usize) -> Self {
        self.eth_failures
            .lock()
            .expect("lock")
            .extend(std::iter::repeat(message.to_owned()).take(times));
        self
    }

    pub fn then_fail_eth(self, message: &str) -> Self {
        self.eth_failures
            .lock()
            .expect("lock")
            .push_back(message.to_owned());
        self
    }

    pub fn fail_eth_always(self, message: &str) -> Self {
        *self.eth_failure.lock().expect("lock") = Some(message.to_owned());
        self
    }

    pub fn fail_tendermint(self, message: &str) -> Self {
        *self.tendermint_failure.lock().expect("lock") = Some(message.to_owned());
        self
    }

    pub fn eth_calls(&self) -> usize {
        self.eth_calls.load(Ordering::SeqCst)
    }

    pub fn tendermint_calls(&self) -> usize {
        self.tendermint_calls.load(Ordering::SeqCst)
    }

    pub fn signed(&self) -> Vec<UnsignedEvmTransaction> {
        self.signed.lock().expect("lock").clone()
    }

    fn eth_result(&self) -> Result<Address, PortError> {
        self.eth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.eth_failures.lock().expect("lock").pop_front() {
            return Err(PortError::Device(message));
        }
        match self.eth_failure.lock().expect("lock").clone() {
            Some(message) => Err(PortError::Device(message)),
            None => Ok(account()),
        }
    }

    fn tendermint_result(&self) -> Result<(), PortError> {
        self.tendermint_calls.fetch_add(1, Ordering::SeqCst);
        match self.tendermint_failure.lock().expect("lock").clone() {
            Some(message) => Err(PortError::Device(message)),
            None => Ok(()),
        }
    }

    fn signature(&self) -> Result<Bytes, PortError> {
        if let Some(message) = self.sign_failure.lock().expect("lock").clone() {
            return Err(PortError::Device(message));
        }
        self.signed_messages.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(vec![0xab; 65]))
    }
}

impl SignerPort for FakeSigner {
    fn is_hardware(&self) -> bool {
        self.hardware
    }

    async fn get_address(
        &self,
        index: u32,
        address_prefix: &str,
        _standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<String, PortError> {
        self.tendermint_result()?;
        Ok(format!("{address_prefix}1fakeaddress{index}"))
    }

    async fn get_eth_address(
        &self,
        _index: u32,
        _standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<Address, PortError> {
        self.eth_result()
    }

    async fn get_address_list(
        &self,
        start: u32,
        count: u32,
        address_prefix: &str,
        _standard: DerivationStandard,
    ) -> Result<Vec<String>, PortError> {
        self.tendermint_result()?;
        Ok((start..start + count)
            .map(|i| format!("{address_prefix}1fakeaddress{i}"))
            .collect())
    }

    async fn get_eth_address_list(
        &self,
        start: u32,
        count: u32,
        _standard: DerivationStandard,
    ) -> Result<Vec<Address>, PortError> {
        self.eth_result()?;
        Ok((start..start + count)
            .map(|i| Address::with_last_byte(i as u8))
            .collect())
    }

    async fn get_pub_key(
        &self,
        _index: u32,
        _standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<Bytes, PortError> {
        self.tendermint_result()?;
        Ok(Bytes::from(vec![0x02; 33]))
    }

    async fn sign_transaction(
        &self,
        _chain: &ChainConfig,
        transaction: &UnsignedEvmTransaction,
        _secret: &Secret,
    ) -> Result<Bytes, PortError> {
        let raw = self.signature()?;
        self.signed.lock().expect("lock").push(transaction.clone());
        Ok(raw)
    }

    async fn sign_message(
        &self,
        _account: Address,
        _data: &[u8],
        _secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.signature()
    }

    async fn sign_personal_message(
        &self,
        _account: Address,
        _data: &[u8],
        _secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.signature()
    }

    async fn sign_typed_data_v4(
        &self,
        _account: Address,
        _typed_data: &str,
        _secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.signature()
    }

    async fn ec_recover(&self, _message: &[u8], _signature: &Bytes) -> Result<Address, PortError> {
        Ok(account())
    }
}

#[derive(Debug)]
pub struct FakeChainData {
    pub estimate: FeeEstimate,
    pub nonce: u64,
    pub fee_fails: bool,
    pub nonce_fails: bool,
    pub metadata: Option<TokenMetadata>,
    pub fee_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
    pub sent: Mutex<Vec<Bytes>>,
}

impl Default for FakeChainData {
    fn default() -> Self {
        Self {
            estimate: FeeEstimate {
                gas_price: U256::from(5_000_000_000u64),
                gas_limit: U256::from(60_000),
                max_fee_per_gas: Some(U256::from(7_000_000_000u64)),
                max_priority_fee_per_gas: Some(U256::from(1_000_000_000u64)),
            },
            nonce: 42,
            fee_fails: false,
            nonce_fails: false,
            metadata: Some(TokenMetadata {
                symbol: "USDC".to_owned(),
                decimals: 6,
            }),
            fee_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl FakeChainData {
    pub fn fee_calls(&self) -> usize {
        self.fee_calls.load(Ordering::SeqCst)
    }

    pub fn nonce_calls(&self) -> usize {
        self.nonce_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> usize {
        self.sent.lock().expect("lock").len()
    }
}

pub fn tx_hash() -> B256 {
    B256::repeat_byte(0x11)
}

impl ChainDataPort for FakeChainData {
    async fn estimate_fee(
        &self,
        _chain: &ChainConfig,
        _query: &FeeQuery,
    ) -> Result<FeeEstimate, PortError> {
        self.fee_calls.fetch_add(1, Ordering::SeqCst);
        if self.fee_fails {
            return Err(PortError::Transport("eth_estimateGas reverted".to_owned()));
        }
        Ok(self.estimate.clone())
    }

    async fn next_nonce(&self, _address: Address, _chain: &ChainConfig) -> Result<u64, PortError> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        if self.nonce_fails {
            return Err(PortError::Transport("connection refused".to_owned()));
        }
        Ok(self.nonce)
    }

    async fn token_metadata(
        &self,
        _chain: &ChainConfig,
        _token: Address,
    ) -> Result<TokenMetadata, PortError> {
        self.metadata
            .clone()
            .ok_or_else(|| PortError::NotFound("symbol".to_owned()))
    }

    async fn send_raw_transaction(
        &self,
        _chain: &ChainConfig,
        raw: &Bytes,
    ) -> Result<B256, PortError> {
        self.sent.lock().expect("lock").push(raw.clone());
        Ok(tx_hash())
    }
}

/// Approves everything unless told otherwise; can hold each prompt open for `delay`.
#[derive(Debug, Default)]
pub struct ScriptedPrompts {
    pub decline_disclosure: bool,
    pub decline_signing: bool,
    pub decline_add: bool,
    pub decline_switch: bool,
    pub decline_watch: bool,
    pub granted_amount: Option<U256>,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<&'static str>>,
    pub finished: Mutex<Vec<Option<String>>>,
}

impl ScriptedPrompts {
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn finished(&self) -> Vec<Option<String>> {
        self.finished.lock().expect("lock").clone()
    }

    async fn answer(&self, prompt: &'static str, decline: bool) -> Result<(), PortError> {
        self.calls.lock().expect("lock").push(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if decline {
            Err(PortError::Declined("User rejected the request.".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl PromptPort for ScriptedPrompts {
    async fn authorize_address_disclosure(&self, _account: Address) -> Result<(), PortError> {
        self.answer("address_disclosure", self.decline_disclosure).await
    }

    async fn authorize_signing(&self, _prompt: &SigningPrompt) -> Result<Secret, PortError> {
        self.answer("signing", self.decline_signing).await?;
        Ok(Secret::new("passphrase"))
    }

    async fn authorize_token_approval(
        &self,
        prompt: &TokenApprovalPrompt,
    ) -> Result<ApprovalGrant, PortError> {
        self.answer("token_approval", self.decline_signing).await?;
        Ok(ApprovalGrant {
            secret: Secret::new("passphrase"),
            amount: self.granted_amount.unwrap_or(prompt.approval.amount),
        })
    }

    async fn authorize_chain_add(&self, _config: &ChainConfig) -> Result<(), PortError> {
        self.answer("chain_add", self.decline_add).await
    }

    async fn authorize_chain_switch(
        &self,
        _prev: &ChainConfig,
        _next: &ChainConfig,
    ) -> Result<(), PortError> {
        self.answer("chain_switch", self.decline_switch).await
    }

    async fn authorize_watch_asset(&self, _asset: &WatchAssetOptions) -> Result<(), PortError> {
        self.answer("watch_asset", self.decline_watch).await
    }

    async fn transaction_finished(&self, error: Option<&str>) {
        self.finished
            .lock()
            .expect("lock")
            .push(error.map(str::to_owned));
    }
}

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    pub saved: Mutex<Vec<WalletAsset>>,
    pub fails: bool,
}

impl MemoryPersistence {
    pub fn saved(&self) -> Vec<WalletAsset> {
        self.saved.lock().expect("lock").clone()
    }
}

impl PersistencePort for MemoryPersistence {
    async fn save_assets(&self, assets: &[WalletAsset]) -> Result<(), PortError> {
        if self.fails {
            return Err(PortError::Transport("disk full".to_owned()));
        }
        self.saved.lock().expect("lock").extend_from_slice(assets);
        Ok(())
    }
}

/// Content view that records every injected script; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    scripts: Arc<Mutex<Vec<String>>>,
}

impl RecordingView {
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().expect("lock").clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.scripts().iter().filter(|s| s.contains(needle)).count()
    }

    /// Scripts that answer request `id`, either success or error.
    pub fn replies_to(&self, id: u64) -> Vec<String> {
        let response = format!("sendResponse({id}");
        let error = format!("sendError({id},");
        self.scripts()
            .into_iter()
            .filter(|s| s.contains(&response) || s.contains(&error))
            .collect()
    }
}

impl ContentViewPort for RecordingView {
    fn execute_script(&self, script: &str) -> Result<(), PortError> {
        self.scripts.lock().expect("lock").push(script.to_owned());
        Ok(())
    }
}

pub type TestBridge =
    BridgeOrchestrator<FakeSigner, FakeChainData, ScriptedPrompts, MemoryPersistence, RecordingView>;

pub struct Harness {
    pub bridge: TestBridge,
    pub view: RecordingView,
}

pub fn harness_with(
    signer: FakeSigner,
    chain_data: FakeChainData,
    prompts: ScriptedPrompts,
    options: BridgeOptions,
) -> Harness {
    let bridge = BridgeOrchestrator::new(
        signer,
        chain_data,
        prompts,
        MemoryPersistence::default(),
        ChainRegistry::with_chains(cronos(), [cronos_testnet()]),
        options,
    );
    let view = RecordingView::default();
    bridge.attach(view.clone());
    Harness { bridge, view }
}

pub fn harness(prompts: ScriptedPrompts) -> Harness {
    harness_with(
        FakeSigner::software(),
        FakeChainData::default(),
        prompts,
        BridgeOptions::default(),
    )
}

pub async fn send(bridge: &TestBridge, message: Value) -> Result<(), dapp_bridge_core::BridgeError> {
    bridge.handle_inbound_event(CHANNEL_NAME, &[message]).await
}
