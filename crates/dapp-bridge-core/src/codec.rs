//! Wire shape of the bridge channel.
//!
//! Inbound messages arrive as `(channel, args)` where `args[0]` is `{name, id, object}`.
//! Outbound messages are script fragments evaluated inside the content view against
//! its `window.ethereum` provider object.

use alloy::primitives::Address;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{BridgeEvent, BridgeEventKind, ProviderConfig, RequestId, ResponsePayload};
use crate::error::BridgeError;

pub const CHANNEL_NAME: &str = "dapp-browser-ipc";

const PROVIDER_OBJECT: &str = "window.ethereum";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Response {
        id: RequestId,
        payload: ResponsePayload,
    },
    Error {
        id: RequestId,
        reason: String,
    },
    SetAddress(Address),
    SetConfig(ProviderConfig),
}

impl OutboundMessage {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Response { id, .. } | Self::Error { id, .. } => Some(*id),
            Self::SetAddress(_) | Self::SetConfig(_) => None,
        }
    }
}

pub fn decode(channel: &str, args: &[Value]) -> Result<BridgeEvent, BridgeError> {
    if channel != CHANNEL_NAME {
        return Err(BridgeError::MalformedEvent(format!(
            "unexpected channel '{channel}'"
        )));
    }
    let raw = args
        .first()
        .ok_or_else(|| BridgeError::MalformedEvent("empty argument list".to_owned()))?;
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::MalformedEvent("missing event name".to_owned()))?;
    if BridgeEventKind::from_name(name).is_none() {
        return Err(BridgeError::UnsupportedEvent(name.to_owned()));
    }

    let event: BridgeEvent = serde_json::from_value(raw.clone())
        .map_err(|e| BridgeError::MalformedEvent(format!("{name}: {e}")))?;

    if let BridgeEvent::AddEthereumChain { object, .. } = &event {
        if object.rpc_urls.is_empty() {
            return Err(BridgeError::MalformedEvent(
                "addEthereumChain: rpcUrls must not be empty".to_owned(),
            ));
        }
    }
    Ok(event)
}

pub fn encode(message: &OutboundMessage) -> String {
    let call = match message {
        OutboundMessage::Response { id, payload } => match payload {
            ResponsePayload::Empty => format!("{PROVIDER_OBJECT}.sendResponse({id})"),
            ResponsePayload::Value(value) => {
                format!("{PROVIDER_OBJECT}.sendResponse({id}, {})", js_literal(value))
            }
            ResponsePayload::Values(values) => {
                format!("{PROVIDER_OBJECT}.sendResponse({id}, {})", js_literal(values))
            }
        },
        OutboundMessage::Error { id, reason } => {
            format!("{PROVIDER_OBJECT}.sendError({id}, {})", js_literal(reason))
        }
        OutboundMessage::SetAddress(address) => format!(
            "{PROVIDER_OBJECT}.setAddress({})",
            js_literal(&address.to_string())
        ),
        OutboundMessage::SetConfig(config) => {
            format!("{PROVIDER_OBJECT}.setConfig({})", js_literal(config))
        }
    };
    format!("(function() {{\n    {call};\n}})();")
}

// JSON is a subset of JS expression syntax, so serde_json output is a safe literal.
fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_owned())
}
