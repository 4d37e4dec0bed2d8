use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::{
    ChainConfig, FeeQuery, NormalizedTransaction, TokenApproval, TransactionKind,
    TransactionRequest, UnsignedEvmTransaction,
};
use crate::error::BridgeError;
use crate::ports::ChainDataPort;

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
}

/// ERC-20 `approve(address,uint256)` selector, `0x095ea7b3`.
pub const APPROVE_SELECTOR: [u8; 4] = approveCall::SELECTOR;

/// Returns `(spender, amount)` when `data` is an ERC-20 approve call. Only the selector
/// decides the classification; a matching selector with undecodable arguments is an error.
pub fn detect_token_approval(data: &[u8]) -> Result<Option<(Address, U256)>, BridgeError> {
    if !data.starts_with(&APPROVE_SELECTOR) {
        return Ok(None);
    }
    let call = approveCall::abi_decode(data, false).map_err(|e| {
        BridgeError::MalformedEvent(format!("approve calldata could not be decoded: {e}"))
    })?;
    Ok(Some((call.spender, call.amount)))
}

pub fn encode_token_approval(spender: Address, amount: U256) -> Bytes {
    Bytes::from(approveCall { spender, amount }.abi_encode())
}

/// Turns a dapp-supplied transaction into a signable one, resolving fees and nonce from
/// the chain data source.
#[derive(Debug)]
pub struct TransactionNormalizer<'a, D> {
    chain_data: &'a D,
}

impl<'a, D: ChainDataPort> TransactionNormalizer<'a, D> {
    pub fn new(chain_data: &'a D) -> Self {
        Self { chain_data }
    }

    pub async fn normalize(
        &self,
        request: &TransactionRequest,
        chain: &ChainConfig,
    ) -> Result<NormalizedTransaction, BridgeError> {
        let (gas_price, gas_limit, max_fee_per_gas, max_priority_fee_per_gas) =
            match (request.gas_price, request.gas) {
                (Some(gas_price), Some(gas_limit)) => (
                    gas_price,
                    gas_limit,
                    request.max_fee_per_gas,
                    request.max_priority_fee_per_gas,
                ),
                (gas_price, gas_limit) => {
                    let query = FeeQuery {
                        from: request.from,
                        to: request.to,
                        data: request.data.clone(),
                        value: request.value.unwrap_or_default(),
                    };
                    let estimate = self
                        .chain_data
                        .estimate_fee(chain, &query)
                        .await
                        .map_err(|e| BridgeError::FeeEstimationFailed(e.to_string()))?;
                    (
                        gas_price.unwrap_or(estimate.gas_price),
                        gas_limit.unwrap_or(estimate.gas_limit),
                        request.max_fee_per_gas.or(estimate.max_fee_per_gas),
                        request
                            .max_priority_fee_per_gas
                            .or(estimate.max_priority_fee_per_gas),
                    )
                }
            };

        // A dapp-supplied nonce is never trusted.
        let nonce = self
            .chain_data
            .next_nonce(request.from, chain)
            .await
            .map_err(|e| BridgeError::NonceResolutionFailed(e.to_string()))?;

        let transaction = UnsignedEvmTransaction {
            chain_id: chain.chain_id,
            from: request.from,
            to: request.to,
            data: request.data.clone(),
            value: request.value,
            gas_limit,
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            nonce,
        };

        let kind = match detect_token_approval(&request.data)? {
            Some((spender, amount)) => {
                let metadata = match self.chain_data.token_metadata(chain, request.to).await {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        tracing::debug!(token = %request.to, error = %e, "token metadata unavailable");
                        None
                    }
                };
                TransactionKind::TokenApproval(TokenApproval {
                    token: request.to,
                    spender,
                    amount,
                    metadata,
                })
            }
            None => TransactionKind::ContractCall,
        };

        Ok(NormalizedTransaction { transaction, kind })
    }
}
