pub mod codec;
pub mod config;
pub mod correlator;
pub mod domain;
pub mod error;
pub mod family;
pub mod hardware;
pub mod normalizer;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod state_machine;
pub mod wallet;

pub use codec::{decode, encode, OutboundMessage, CHANNEL_NAME};
pub use config::{BridgeOptions, HardwareOptions, PollPolicy};
pub use correlator::{RequestCorrelator, RequestOutcome, RequestTicket, ResponseWaiter};
pub use domain::{
    ApprovalGrant, AuthorizationKind, BridgeEvent, BridgeEventKind, ChainConfig, ChainId,
    EcRecoverPayload, FeeEstimate, FeeQuery, MessagePayload, NativeCurrency, NormalizedTransaction,
    ProviderConfig, RequestId, ResponsePayload, Secret, SigningPrompt, SwitchChainPayload,
    TokenApproval, TokenApprovalPrompt, TokenMetadata, TransactionKind, TransactionRequest,
    TypedMessagePayload, UnsignedEvmTransaction, WalletAsset, WatchAssetOptions,
    WatchAssetPayload,
};
pub use error::BridgeError;
pub use family::{AssetFamily, DerivationStandard, DerivedAddress};
pub use hardware::{
    classify_device_error, HardwareCoordinator, HardwareErrorKind, HardwareSession,
    SessionHandle, WalletAddressPlan, WalletAddresses,
};
pub use normalizer::{
    detect_token_approval, encode_token_approval, TransactionNormalizer, APPROVE_SELECTOR,
};
pub use orchestrator::BridgeOrchestrator;
pub use ports::{
    ChainDataPort, ContentViewPort, PersistencePort, PortError, PromptPort, SignerPort,
};
pub use registry::{ChainRegistry, SwitchPlan};
pub use state_machine::{hardware_transition, HardwareAction, HardwareState, StateTransition};
pub use wallet::{create_hardware_wallet, CreatedWallet, HardwareWalletRequest, WalletCreationError};
