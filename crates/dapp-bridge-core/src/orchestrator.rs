use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::{hex, Address, Bytes, B256};
use serde_json::Value;

use crate::codec::{self, OutboundMessage};
use crate::config::BridgeOptions;
use crate::correlator::{RequestCorrelator, RequestTicket};
use crate::domain::{
    BridgeEvent, ChainConfig, ChainId, NormalizedTransaction, ProviderConfig,
    ResponsePayload, Secret, SigningPrompt, TokenApprovalPrompt, TransactionKind, WalletAsset,
    WatchAssetPayload,
};
use crate::error::BridgeError;
use crate::family::AssetFamily;
use crate::hardware::{HardwareCoordinator, HardwareSession};
use crate::normalizer::{encode_token_approval, TransactionNormalizer};
use crate::ports::{
    ChainDataPort, ContentViewPort, PersistencePort, PortError, PromptPort, SignerPort,
};
use crate::registry::{ChainRegistry, SwitchPlan};
use crate::wallet::{self, CreatedWallet, HardwareWalletRequest, WalletCreationError};

const ERC20_ASSET_TYPE: &str = "ERC20";

/// Root of the bridge: owns the content view channel, the chain registry and the
/// pending-request set, and routes every inbound event to exactly one outbound
/// response or error.
pub struct BridgeOrchestrator<S, D, P, W, V>
where
    S: SignerPort,
    D: ChainDataPort,
    P: PromptPort,
    W: PersistencePort,
    V: ContentViewPort,
{
    pub signer: S,
    pub chain_data: D,
    pub prompts: P,
    pub persistence: W,
    options: BridgeOptions,
    registry: Mutex<ChainRegistry>,
    correlator: RequestCorrelator,
    view: Mutex<Option<V>>,
    account: Mutex<Option<Address>>,
}

impl<S, D, P, W, V> BridgeOrchestrator<S, D, P, W, V>
where
    S: SignerPort,
    D: ChainDataPort,
    P: PromptPort,
    W: PersistencePort,
    V: ContentViewPort,
{
    pub fn new(
        signer: S,
        chain_data: D,
        prompts: P,
        persistence: W,
        registry: ChainRegistry,
        options: BridgeOptions,
    ) -> Self {
        Self {
            signer,
            chain_data,
            prompts,
            persistence,
            options,
            registry: Mutex::new(registry),
            correlator: RequestCorrelator::new(),
            view: Mutex::new(None),
            account: Mutex::new(None),
        }
    }

    fn registry(&self) -> MutexGuard<'_, ChainRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self) -> MutexGuard<'_, Option<V>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn account_slot(&self) -> MutexGuard<'_, Option<Address>> {
        self.account.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn selected_chain(&self) -> ChainConfig {
        self.registry().selected().clone()
    }

    pub fn chains(&self) -> Vec<ChainConfig> {
        self.registry().list().to_vec()
    }

    pub fn account(&self) -> Option<Address> {
        *self.account_slot()
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn is_attached(&self) -> bool {
        self.view().is_some()
    }

    pub fn attach(&self, view: V) {
        *self.view() = Some(view);
        tracing::info!("content view attached");
    }

    /// Drops the content view and orphans every in-flight request. Returns the number of
    /// requests that will never be answered.
    pub fn detach(&self) -> usize {
        self.view().take();
        let orphaned = self.correlator.clear();
        tracing::info!(orphaned, "content view detached");
        orphaned
    }

    pub fn on_content_loaded(&self) -> Result<(), BridgeError> {
        self.inject_config()
    }

    pub fn set_account(&self, address: Address) -> Result<(), BridgeError> {
        *self.account_slot() = Some(address);
        self.deliver(&OutboundMessage::SetAddress(address))
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let chain = self.selected_chain();
        ProviderConfig {
            address: self.account(),
            chain_id: chain.chain_id,
            rpc_url: chain.primary_rpc_url().unwrap_or_default().to_owned(),
            is_debug: self.options.is_debug,
        }
    }

    pub fn inject_config(&self) -> Result<(), BridgeError> {
        self.deliver(&OutboundMessage::SetConfig(self.provider_config()))
    }

    fn deliver(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        let script = codec::encode(message);
        let view = self.view();
        let view = view.as_ref().ok_or(BridgeError::ContentViewDetached)?;
        view.execute_script(&script)
            .map_err(|e| BridgeError::ContentView(e.to_string()))
    }

    pub fn hardware_coordinator(&self) -> HardwareCoordinator<'_, S> {
        HardwareCoordinator::new(&self.signer, &self.options.hardware)
    }

    pub async fn create_hardware_wallet(
        &self,
        session: &mut HardwareSession,
        request: &HardwareWalletRequest,
    ) -> Result<CreatedWallet, WalletCreationError> {
        wallet::create_hardware_wallet(
            &self.hardware_coordinator(),
            &self.persistence,
            session,
            request,
        )
        .await
    }

    /// Entry point for raw channel messages. Events that fail to decode are dropped and
    /// produce no outbound message.
    pub async fn handle_inbound_event(
        &self,
        channel: &str,
        args: &[Value],
    ) -> Result<(), BridgeError> {
        let event = match codec::decode(channel, args) {
            Ok(event) => event,
            Err(err @ BridgeError::UnsupportedEvent(_)) => {
                tracing::debug!(error = %err, "ignoring bridge event");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed bridge event");
                return Err(err);
            }
        };
        self.handle_event(event).await
    }

    pub async fn handle_event(&self, event: BridgeEvent) -> Result<(), BridgeError> {
        let id = event.id();
        let kind = event.kind();
        let waiter = self.correlator.register(id)?;
        let ticket = waiter.ticket();
        tracing::debug!(
            id,
            seq = ticket.seq(),
            %kind,
            authorization = ?kind.authorization(),
            "bridge event accepted"
        );

        match self.dispatch(ticket, event).await {
            Ok(payload) => {
                self.correlator.resolve(ticket, payload);
            }
            Err(err) => {
                tracing::warn!(id, %kind, error = %err, "bridge request failed");
                self.correlator.reject(ticket, err.to_string());
            }
        }

        match waiter.wait().await {
            Some(Ok(payload)) => self.deliver(&OutboundMessage::Response { id, payload }),
            Some(Err(reason)) => self.deliver(&OutboundMessage::Error { id, reason }),
            None => {
                tracing::debug!(id, "request orphaned before completion");
                Ok(())
            }
        }
    }

    async fn dispatch(
        &self,
        ticket: RequestTicket,
        event: BridgeEvent,
    ) -> Result<ResponsePayload, BridgeError> {
        match event {
            BridgeEvent::RequestAccounts { .. } => {
                let account = self.resolve_account().await?;
                self.prompts
                    .authorize_address_disclosure(account)
                    .await
                    .map_err(BridgeError::from_prompt)?;
                self.ensure_pending(ticket)?;
                self.disclose_account(account);
                Ok(ResponsePayload::Values(vec![Value::String(
                    account.to_string(),
                )]))
            }
            BridgeEvent::SignTransaction { object, .. } => {
                let chain = self.selected_chain();
                let result = match TransactionNormalizer::new(&self.chain_data)
                    .normalize(&object, &chain)
                    .await
                {
                    Ok(normalized) => self.sign_and_submit(ticket, &chain, normalized).await,
                    Err(err) => Err(err),
                };
                let failure = result.as_ref().err().map(ToString::to_string);
                self.prompts.transaction_finished(failure.as_deref()).await;
                result.map(|hash| ResponsePayload::text(hash.to_string()))
            }
            BridgeEvent::SignMessage { id, object } => {
                if !self.options.allow_eth_sign {
                    return Err(BridgeError::Disabled("eth_sign is disabled".to_owned()));
                }
                let account = self.resolve_account().await?;
                let data = message_bytes(&object.data)?;
                let secret = self
                    .authorize_signing(SigningPrompt::EthSign {
                        id,
                        account,
                        data: data.clone(),
                    })
                    .await?;
                self.ensure_pending(ticket)?;
                self.ensure_hardware_app().await?;
                let signature = self
                    .signer
                    .sign_message(account, &data, &secret)
                    .await
                    .map_err(|e| self.signer_error(e))?;
                Ok(ResponsePayload::text(signature.to_string()))
            }
            BridgeEvent::SignPersonalMessage { id, object } => {
                let account = self.resolve_account().await?;
                let data = message_bytes(&object.data)?;
                let secret = self
                    .authorize_signing(SigningPrompt::PersonalMessage {
                        id,
                        account,
                        data: data.clone(),
                    })
                    .await?;
                self.ensure_pending(ticket)?;
                self.ensure_hardware_app().await?;
                let signature = self
                    .signer
                    .sign_personal_message(account, &data, &secret)
                    .await
                    .map_err(|e| self.signer_error(e))?;
                Ok(ResponsePayload::text(signature.to_string()))
            }
            BridgeEvent::SignTypedMessage { id, object } => {
                let account = self.resolve_account().await?;
                let secret = self
                    .authorize_signing(SigningPrompt::TypedMessage {
                        id,
                        account,
                        raw: object.raw.clone(),
                    })
                    .await?;
                self.ensure_pending(ticket)?;
                self.ensure_hardware_app().await?;
                let signature = self
                    .signer
                    .sign_typed_data_v4(account, &object.raw, &secret)
                    .await
                    .map_err(|e| self.signer_error(e))?;
                Ok(ResponsePayload::text(signature.to_string()))
            }
            BridgeEvent::EcRecover { object, .. } => {
                let message = message_bytes(&object.message)?;
                let recovered = self
                    .signer
                    .ec_recover(&message, &object.signature)
                    .await
                    .map_err(BridgeError::from_signer)?;
                Ok(ResponsePayload::text(recovered.to_string()))
            }
            BridgeEvent::WatchAsset { object, .. } => self.watch_asset(object).await,
            BridgeEvent::AddEthereumChain { object, .. } => {
                self.add_chain(object).await?;
                Ok(ResponsePayload::Empty)
            }
            BridgeEvent::SwitchEthereumChain { object, .. } => {
                self.switch_chain(object.chain_id).await?;
                Ok(ResponsePayload::Empty)
            }
        }
    }

    async fn sign_and_submit(
        &self,
        ticket: RequestTicket,
        chain: &ChainConfig,
        normalized: NormalizedTransaction,
    ) -> Result<B256, BridgeError> {
        let id = ticket.id;
        let NormalizedTransaction {
            mut transaction,
            kind,
        } = normalized;

        let secret = match kind {
            TransactionKind::ContractCall => {
                self.authorize_signing(SigningPrompt::SendTransaction {
                    id,
                    chain: chain.clone(),
                    transaction: transaction.clone(),
                })
                .await?
            }
            TransactionKind::TokenApproval(approval) => {
                let prompt = TokenApprovalPrompt {
                    id,
                    chain: chain.clone(),
                    transaction: transaction.clone(),
                    approval,
                };
                let grant = self
                    .prompts
                    .authorize_token_approval(&prompt)
                    .await
                    .map_err(BridgeError::from_prompt)?;
                if grant.amount != prompt.approval.amount {
                    tracing::info!(id, "token allowance adjusted by user");
                }
                transaction.data = encode_token_approval(prompt.approval.spender, grant.amount);
                grant.secret
            }
        };

        self.ensure_pending(ticket)?;
        self.ensure_hardware_app().await?;
        let raw = self
            .signer
            .sign_transaction(chain, &transaction, &secret)
            .await
            .map_err(|e| self.signer_error(e))?;
        let hash = self
            .chain_data
            .send_raw_transaction(chain, &raw)
            .await
            .map_err(|e| BridgeError::Submission(e.to_string()))?;
        tracing::info!(id, %hash, chain_id = %chain.chain_id, "transaction submitted");
        Ok(hash)
    }

    async fn watch_asset(&self, payload: WatchAssetPayload) -> Result<ResponsePayload, BridgeError> {
        if !payload.asset_type.eq_ignore_ascii_case(ERC20_ASSET_TYPE) {
            return Err(BridgeError::MalformedEvent(format!(
                "unsupported asset type '{}'",
                payload.asset_type
            )));
        }
        self.prompts
            .authorize_watch_asset(&payload.options)
            .await
            .map_err(BridgeError::from_prompt)?;
        let asset = WalletAsset::WatchedToken {
            owner: self.account(),
            chain_id: self.selected_chain().chain_id,
            token: payload.options,
        };
        self.persistence
            .save_assets(std::slice::from_ref(&asset))
            .await
            .map_err(|e| BridgeError::Persistence(e.to_string()))?;
        Ok(ResponsePayload::Value(Value::Bool(true)))
    }

    /// Adds an unknown chain after approval, then asks to switch to it. Known chains skip
    /// the add prompt. Either way a declined switch leaves the request successful, since
    /// the chain is present in the registry afterwards.
    async fn add_chain(&self, config: ChainConfig) -> Result<(), BridgeError> {
        let target = config.chain_id;
        if self.registry().contains(target) {
            tracing::debug!(chain_id = %target, "chain already known");
        } else {
            self.prompts
                .authorize_chain_add(&config)
                .await
                .map_err(BridgeError::from_prompt)?;
            let name = config.chain_name.clone();
            if self.registry().add(config) {
                tracing::info!(chain_id = %target, %name, "chain added");
            }
        }

        match self.switch_chain(target).await {
            Err(BridgeError::UserDeclined(reason)) => {
                tracing::info!(chain_id = %target, %reason, "switch to added chain declined");
                Ok(())
            }
            other => other,
        }
    }

    async fn switch_chain(&self, target: ChainId) -> Result<(), BridgeError> {
        let plan = self.registry().switch_to(target)?;
        let SwitchPlan::Required { prev, next } = plan else {
            tracing::debug!(chain_id = %target, "chain already selected");
            return Ok(());
        };

        if let Err(err) = self.prompts.authorize_chain_switch(&prev, &next).await {
            self.registry().abort_switch(target);
            return Err(BridgeError::from_prompt(err));
        }
        let committed = self.registry().commit_switch(target)?.chain_id;
        tracing::info!(from = %prev.chain_id, to = %committed, "selected chain switched");

        match self.inject_config() {
            Ok(()) => {}
            Err(BridgeError::ContentViewDetached) => {
                tracing::debug!("no content view to receive chain config");
            }
            Err(err) => tracing::warn!(error = %err, "chain config injection failed"),
        }
        Ok(())
    }

    async fn authorize_signing(
        &self,
        prompt: SigningPrompt,
    ) -> Result<Secret, BridgeError> {
        self.prompts
            .authorize_signing(&prompt)
            .await
            .map_err(BridgeError::from_prompt)
    }

    // A request orphaned while the user was prompted must not reach the signer.
    fn ensure_pending(&self, ticket: RequestTicket) -> Result<(), BridgeError> {
        if self.correlator.is_pending(ticket) {
            Ok(())
        } else {
            Err(BridgeError::ContentViewDetached)
        }
    }

    /// The disclosed account, or the signer's account without disclosing it. Only an
    /// approved `requestAccounts` makes the page aware of the address.
    async fn resolve_account(&self) -> Result<Address, BridgeError> {
        if let Some(account) = self.account() {
            return Ok(account);
        }
        self.signer
            .get_eth_address(
                self.options.account_index,
                self.options.derivation_standard,
                false,
            )
            .await
            .map_err(|e| self.signer_error(e))
    }

    fn disclose_account(&self, account: Address) {
        match self.set_account(account) {
            Ok(()) => {}
            Err(BridgeError::ContentViewDetached) => {
                tracing::debug!("no content view to receive address");
            }
            Err(err) => tracing::warn!(error = %err, "address injection failed"),
        }
    }

    async fn ensure_hardware_app(&self) -> Result<(), BridgeError> {
        if !self.signer.is_hardware() {
            return Ok(());
        }
        let mut session = HardwareSession::new();
        self.hardware_coordinator()
            .ensure_app(
                &mut session,
                &AssetFamily::Evm,
                self.options.account_index,
                self.options.derivation_standard,
            )
            .await
    }

    fn signer_error(&self, err: PortError) -> BridgeError {
        match err {
            PortError::Device(message) if self.signer.is_hardware() => {
                BridgeError::Hardware(self.options.hardware.classify(&message))
            }
            other => BridgeError::from_signer(other),
        }
    }
}

/// `0x`-prefixed payloads are hex; anything else is taken as UTF-8 text.
fn message_bytes(data: &str) -> Result<Bytes, BridgeError> {
    if let Some(digits) = data.strip_prefix("0x").or_else(|| data.strip_prefix("0X")) {
        hex::decode(digits)
            .map(Bytes::from)
            .map_err(|e| BridgeError::MalformedEvent(format!("invalid hex message: {e}")))
    } else {
        Ok(Bytes::copy_from_slice(data.as_bytes()))
    }
}
