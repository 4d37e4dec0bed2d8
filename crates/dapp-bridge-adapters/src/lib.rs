pub mod chain_data;
pub mod config;
pub mod persistence;
pub mod prompt;
pub mod signer;
pub mod view;

pub use chain_data::JsonRpcChainDataAdapter;
pub use config::BridgeAdapterConfig;
pub use persistence::InMemoryPersistence;
pub use prompt::ScriptedPromptAdapter;
pub use signer::DeterministicSigner;
pub use view::{RecordingContentView, StdoutContentView};
