use thiserror::Error;

use crate::domain::{ChainId, RequestId};
use crate::hardware::HardwareErrorKind;
use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("malformed bridge event: {0}")]
    MalformedEvent(String),
    #[error("unsupported bridge event: {0}")]
    UnsupportedEvent(String),
    #[error("duplicate request id {0}")]
    DuplicateRequest(RequestId),
    #[error("fee estimation failed: {0}")]
    FeeEstimationFailed(String),
    #[error("nonce resolution failed: {0}")]
    NonceResolutionFailed(String),
    #[error("Unrecognized chain ID {0}")]
    UnknownChain(ChainId),
    #[error("a switch to chain {0} is already awaiting approval")]
    SwitchPending(ChainId),
    #[error("{0}")]
    UserDeclined(String),
    #[error("prompt failed: {0}")]
    PromptFailed(String),
    #[error("{}", .0.remediation())]
    Hardware(HardwareErrorKind),
    #[error("signer error: {0}")]
    Signer(String),
    #[error("transaction submission failed: {0}")]
    Submission(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("content view error: {0}")]
    ContentView(String),
    #[error("content view detached")]
    ContentViewDetached,
    #[error("no account available")]
    NoAccount,
    #[error("{0}")]
    Disabled(String),
    #[error("illegal hardware transition: {0}")]
    IllegalTransition(String),
}

impl BridgeError {
    pub(crate) fn from_prompt(err: PortError) -> Self {
        match err {
            PortError::Declined(reason) => Self::UserDeclined(reason),
            other => Self::PromptFailed(other.to_string()),
        }
    }

    pub(crate) fn from_signer(err: PortError) -> Self {
        Self::Signer(err.to_string())
    }
}
