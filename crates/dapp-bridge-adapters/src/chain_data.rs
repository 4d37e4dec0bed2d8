use alloy::primitives::{hex, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde_json::{json, Value};

use dapp_bridge_core::{
    ChainConfig, ChainDataPort, FeeEstimate, FeeQuery, PortError, TokenMetadata,
};

use crate::BridgeAdapterConfig;

sol! {
    function symbol() external view returns (string);
    function decimals() external view returns (uint8);
}

/// Chain data source backed by the selected chain's first JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcChainDataAdapter {
    mode: RpcMode,
}

#[derive(Debug, Clone)]
enum RpcMode {
    Disabled(String),
    Http(reqwest::Client),
}

impl Default for JsonRpcChainDataAdapter {
    fn default() -> Self {
        Self::with_config(&BridgeAdapterConfig::from_env())
    }
}

impl JsonRpcChainDataAdapter {
    pub fn with_config(config: &BridgeAdapterConfig) -> Self {
        let mode = match reqwest::Client::builder()
            .timeout(config.rpc_timeout())
            .build()
        {
            Ok(client) => RpcMode::Http(client),
            Err(e) => RpcMode::Disabled(format!("failed to initialize json-rpc client: {e}")),
        };
        Self { mode }
    }

    async fn rpc_call(
        &self,
        chain: &ChainConfig,
        method: &str,
        params: Value,
    ) -> Result<Value, PortError> {
        let client = match &self.mode {
            RpcMode::Http(client) => client,
            RpcMode::Disabled(reason) => return Err(PortError::Transport(reason.clone())),
        };
        let url = chain.primary_rpc_url().ok_or_else(|| {
            PortError::Validation(format!("chain {} has no rpc url", chain.chain_id))
        })?;

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, url, "json-rpc request");
        let response = client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("{method} json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{method} status {status}: {body}"
            )));
        }
        if let Some(err) = body.get("error") {
            return Err(PortError::Transport(format!("{method} returned error: {err}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{method} missing result")))
    }

    async fn quantity_call(
        &self,
        chain: &ChainConfig,
        method: &str,
        params: Value,
    ) -> Result<U256, PortError> {
        let result = self.rpc_call(chain, method, params).await?;
        parse_quantity(&result, method)
    }

    async fn eth_call(
        &self,
        chain: &ChainConfig,
        to: Address,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, PortError> {
        let call = json!({"to": to, "data": Bytes::from(data)});
        let result = self
            .rpc_call(chain, "eth_call", json!([call, "latest"]))
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| PortError::Transport("eth_call: string expected".to_owned()))?;
        hex::decode(raw).map_err(|e| PortError::Validation(format!("eth_call: invalid hex: {e}")))
    }

    // EIP-1559 fields are best-effort: legacy chains have no base fee.
    async fn eip1559_fees(&self, chain: &ChainConfig) -> Result<(U256, U256), PortError> {
        let priority = self
            .quantity_call(chain, "eth_maxPriorityFeePerGas", json!([]))
            .await?;
        let block = self
            .rpc_call(chain, "eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = block
            .get("baseFeePerGas")
            .ok_or_else(|| PortError::NotFound("baseFeePerGas".to_owned()))
            .and_then(|v| parse_quantity(v, "baseFeePerGas"))?;
        let max_fee = base_fee.saturating_mul(U256::from(2)).saturating_add(priority);
        Ok((max_fee, priority))
    }
}

impl ChainDataPort for JsonRpcChainDataAdapter {
    async fn estimate_fee(
        &self,
        chain: &ChainConfig,
        query: &FeeQuery,
    ) -> Result<FeeEstimate, PortError> {
        let gas_price = self.quantity_call(chain, "eth_gasPrice", json!([])).await?;
        let call = json!({
            "from": query.from,
            "to": query.to,
            "data": query.data,
            "value": format!("{:#x}", query.value),
        });
        let gas_limit = self
            .quantity_call(chain, "eth_estimateGas", json!([call]))
            .await?;

        let (max_fee_per_gas, max_priority_fee_per_gas) = match self.eip1559_fees(chain).await {
            Ok((max_fee, priority)) => (Some(max_fee), Some(priority)),
            Err(e) => {
                tracing::debug!(chain_id = %chain.chain_id, error = %e, "no eip-1559 fee data");
                (None, None)
            }
        };

        Ok(FeeEstimate {
            gas_price,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    async fn next_nonce(&self, address: Address, chain: &ChainConfig) -> Result<u64, PortError> {
        let count = self
            .quantity_call(chain, "eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        u64::try_from(count)
            .map_err(|e| PortError::Validation(format!("nonce out of range: {e}")))
    }

    async fn token_metadata(
        &self,
        chain: &ChainConfig,
        token: Address,
    ) -> Result<TokenMetadata, PortError> {
        let raw = self
            .eth_call(chain, token, symbolCall {}.abi_encode())
            .await?;
        let symbol = symbolCall::abi_decode_returns(&raw, false)
            .map_err(|e| PortError::Validation(format!("symbol() decode failed: {e}")))?
            ._0;
        let raw = self
            .eth_call(chain, token, decimalsCall {}.abi_encode())
            .await?;
        let decimals = decimalsCall::abi_decode_returns(&raw, false)
            .map_err(|e| PortError::Validation(format!("decimals() decode failed: {e}")))?
            ._0;
        Ok(TokenMetadata { symbol, decimals })
    }

    async fn send_raw_transaction(
        &self,
        chain: &ChainConfig,
        raw: &Bytes,
    ) -> Result<B256, PortError> {
        let result = self
            .rpc_call(chain, "eth_sendRawTransaction", json!([raw]))
            .await?;
        result
            .as_str()
            .ok_or_else(|| {
                PortError::Transport("eth_sendRawTransaction: string expected".to_owned())
            })?
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid transaction hash: {e}")))
    }
}

fn parse_quantity(value: &Value, what: &str) -> Result<U256, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Transport(format!("{what}: hex string expected")))?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| PortError::Validation(format!("{what}: missing 0x prefix")))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| PortError::Validation(format!("{what}: invalid quantity: {e}")))
}
