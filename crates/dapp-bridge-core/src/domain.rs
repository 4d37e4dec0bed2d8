use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::family::AssetFamily;

/// Identifier assigned by the content view. Unique only within one bridge session.
pub type RequestId = u64;

/// Numeric chain identifier. Serialized as a `0x`-prefixed hex string, so two
/// configurations that spell the same id differently (`0x19`, `0X19`, `25`) compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chain id '{0}'")]
pub struct InvalidChainId(pub String);

impl FromStr for ChainId {
    type Err = InvalidChainId;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse()
        };
        parsed.map(ChainId).map_err(|_| InvalidChainId(raw.to_owned()))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            Value::Number(n) => n
                .as_u64()
                .map(ChainId)
                .ok_or_else(|| serde::de::Error::custom("chain id must be a non-negative integer")),
            other => Err(serde::de::Error::custom(format!(
                "chain id must be string or number, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub rpc_urls: Vec<String>,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl ChainConfig {
    pub fn primary_rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }
}

/// The `object` of a `signTransaction` event as sent by the dapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub value: Option<U256>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub gas: Option<U256>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub gas_price: Option<U256>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Accepted for wire compatibility only; never used for signing.
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub nonce: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedMessagePayload {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcRecoverPayload {
    pub message: String,
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetOptions {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetPayload {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub options: WatchAssetOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainPayload {
    pub chain_id: ChainId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum BridgeEvent {
    RequestAccounts {
        id: RequestId,
        #[serde(default)]
        object: Value,
    },
    SignTransaction {
        id: RequestId,
        object: TransactionRequest,
    },
    SignMessage {
        id: RequestId,
        object: MessagePayload,
    },
    SignPersonalMessage {
        id: RequestId,
        object: MessagePayload,
    },
    SignTypedMessage {
        id: RequestId,
        object: TypedMessagePayload,
    },
    EcRecover {
        id: RequestId,
        object: EcRecoverPayload,
    },
    WatchAsset {
        id: RequestId,
        object: WatchAssetPayload,
    },
    AddEthereumChain {
        id: RequestId,
        object: ChainConfig,
    },
    SwitchEthereumChain {
        id: RequestId,
        object: SwitchChainPayload,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeEventKind {
    RequestAccounts,
    SignTransaction,
    SignMessage,
    SignPersonalMessage,
    SignTypedMessage,
    EcRecover,
    WatchAsset,
    AddEthereumChain,
    SwitchEthereumChain,
}

impl BridgeEventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "requestAccounts" => Self::RequestAccounts,
            "signTransaction" => Self::SignTransaction,
            "signMessage" => Self::SignMessage,
            "signPersonalMessage" => Self::SignPersonalMessage,
            "signTypedMessage" => Self::SignTypedMessage,
            "ecRecover" => Self::EcRecover,
            "watchAsset" => Self::WatchAsset,
            "addEthereumChain" => Self::AddEthereumChain,
            "switchEthereumChain" => Self::SwitchEthereumChain,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RequestAccounts => "requestAccounts",
            Self::SignTransaction => "signTransaction",
            Self::SignMessage => "signMessage",
            Self::SignPersonalMessage => "signPersonalMessage",
            Self::SignTypedMessage => "signTypedMessage",
            Self::EcRecover => "ecRecover",
            Self::WatchAsset => "watchAsset",
            Self::AddEthereumChain => "addEthereumChain",
            Self::SwitchEthereumChain => "switchEthereumChain",
        }
    }

    pub fn authorization(self) -> AuthorizationKind {
        match self {
            Self::RequestAccounts => AuthorizationKind::AddressDisclosure,
            Self::SignTransaction
            | Self::SignMessage
            | Self::SignPersonalMessage
            | Self::SignTypedMessage => AuthorizationKind::TransactionApproval,
            Self::AddEthereumChain | Self::SwitchEthereumChain => {
                AuthorizationKind::ChainSwitchApproval
            }
            Self::WatchAsset => AuthorizationKind::AssetWatchApproval,
            Self::EcRecover => AuthorizationKind::None,
        }
    }
}

impl fmt::Display for BridgeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BridgeEvent {
    pub fn id(&self) -> RequestId {
        match self {
            Self::RequestAccounts { id, .. }
            | Self::SignTransaction { id, .. }
            | Self::SignMessage { id, .. }
            | Self::SignPersonalMessage { id, .. }
            | Self::SignTypedMessage { id, .. }
            | Self::EcRecover { id, .. }
            | Self::WatchAsset { id, .. }
            | Self::AddEthereumChain { id, .. }
            | Self::SwitchEthereumChain { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> BridgeEventKind {
        match self {
            Self::RequestAccounts { .. } => BridgeEventKind::RequestAccounts,
            Self::SignTransaction { .. } => BridgeEventKind::SignTransaction,
            Self::SignMessage { .. } => BridgeEventKind::SignMessage,
            Self::SignPersonalMessage { .. } => BridgeEventKind::SignPersonalMessage,
            Self::SignTypedMessage { .. } => BridgeEventKind::SignTypedMessage,
            Self::EcRecover { .. } => BridgeEventKind::EcRecover,
            Self::WatchAsset { .. } => BridgeEventKind::WatchAsset,
            Self::AddEthereumChain { .. } => BridgeEventKind::AddEthereumChain,
            Self::SwitchEthereumChain { .. } => BridgeEventKind::SwitchEthereumChain,
        }
    }

    pub fn authorization_kind(&self) -> AuthorizationKind {
        self.kind().authorization()
    }
}

/// Human authorization an event needs before its privileged action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationKind {
    None,
    AddressDisclosure,
    TransactionApproval,
    ChainSwitchApproval,
    AssetWatchApproval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Empty,
    Value(Value),
    Values(Vec<Value>),
}

impl ResponsePayload {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Value(Value::String(value.into()))
    }
}

/// State pushed into the content view's provider object via `setConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub address: Option<Address>,
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub is_debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedEvmTransaction {
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuery {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub gas_price: U256,
    pub gas_limit: U256,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenApproval {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
    pub metadata: Option<TokenMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransactionKind {
    ContractCall,
    TokenApproval(TokenApproval),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTransaction {
    pub transaction: UnsignedEvmTransaction,
    pub kind: TransactionKind,
}

/// Decryption passphrase supplied interactively for one signing operation.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningPrompt {
    SendTransaction {
        id: RequestId,
        chain: ChainConfig,
        transaction: UnsignedEvmTransaction,
    },
    EthSign {
        id: RequestId,
        account: Address,
        data: Bytes,
    },
    PersonalMessage {
        id: RequestId,
        account: Address,
        data: Bytes,
    },
    TypedMessage {
        id: RequestId,
        account: Address,
        raw: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenApprovalPrompt {
    pub id: RequestId,
    pub chain: ChainConfig,
    pub transaction: UnsignedEvmTransaction,
    pub approval: TokenApproval,
}

/// What the user granted on the token-approval prompt. `amount` may differ from the
/// dapp's requested allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalGrant {
    pub secret: Secret,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WalletAsset {
    #[serde(rename_all = "camelCase")]
    Account {
        wallet_id: String,
        family: AssetFamily,
        address: String,
        derivation_path: String,
    },
    #[serde(rename_all = "camelCase")]
    WatchedToken {
        owner: Option<Address>,
        chain_id: ChainId,
        token: WatchAssetOptions,
    },
}

pub(crate) mod quantity {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(crate) fn parse(raw: &str) -> Result<U256, String> {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() {
                return Ok(U256::ZERO);
            }
            U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex quantity: {e}"))
        } else {
            U256::from_str_radix(trimmed, 10).map_err(|e| format!("invalid quantity: {e}"))
        }
    }

    pub(crate) fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => parse(&s).map(Some).map_err(serde::de::Error::custom),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(U256::from(v)))
                .ok_or_else(|| serde::de::Error::custom("quantity must be a non-negative integer")),
            Some(other) => Err(serde::de::Error::custom(format!(
                "quantity must be string or number, got {other}"
            ))),
        }
    }
}
