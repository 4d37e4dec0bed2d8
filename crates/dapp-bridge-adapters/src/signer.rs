use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{keccak256, Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use dapp_bridge_core::{
    AssetFamily, ChainConfig, DerivationStandard, PortError, Secret, SignerPort,
    UnsignedEvmTransaction,
};

use crate::BridgeAdapterConfig;

/// Indexes scanned when mapping an account back to its signing key.
const ACCOUNT_SEARCH_DEPTH: u32 = 20;

/// Software signer deriving keys from a fixed seed. Development use only.
///
/// Keys are `keccak256(seed || derivation_path)`, so the same seed always yields the
/// same accounts. Tendermint addresses and typed-data signing are not supported.
#[derive(Debug, Clone)]
pub struct DeterministicSigner {
    seed: Vec<u8>,
    passphrase: Option<String>,
}

impl DeterministicSigner {
    pub fn new(seed: impl AsRef<[u8]>, passphrase: Option<String>) -> Self {
        Self {
            seed: seed.as_ref().to_vec(),
            passphrase,
        }
    }

    pub fn with_config(config: &BridgeAdapterConfig) -> Self {
        Self::new(&config.signer_seed, config.passphrase.clone())
    }

    fn key(&self, index: u32, standard: DerivationStandard) -> Result<PrivateKeySigner, PortError> {
        let path = AssetFamily::Evm.derivation_path(index, standard);
        let mut material = self.seed.clone();
        material.extend_from_slice(path.as_bytes());
        PrivateKeySigner::from_bytes(&keccak256(&material))
            .map_err(|e| PortError::Validation(format!("key derivation failed: {e}")))
    }

    fn key_for(&self, account: Address) -> Result<PrivateKeySigner, PortError> {
        for standard in [DerivationStandard::Bip44, DerivationStandard::LedgerLive] {
            for index in 0..ACCOUNT_SEARCH_DEPTH {
                let key = self.key(index, standard)?;
                if key.address() == account {
                    return Ok(key);
                }
            }
        }
        Err(PortError::NotFound(format!("no key for account {account}")))
    }

    fn check_secret(&self, secret: &Secret) -> Result<(), PortError> {
        match &self.passphrase {
            Some(expected) if expected != secret.expose() => {
                Err(PortError::Validation("incorrect passphrase".to_owned()))
            }
            _ => Ok(()),
        }
    }
}

impl SignerPort for DeterministicSigner {
    fn is_hardware(&self) -> bool {
        false
    }

    async fn get_address(
        &self,
        _index: u32,
        _address_prefix: &str,
        _standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<String, PortError> {
        Err(PortError::NotImplemented("tendermint addresses"))
    }

    async fn get_eth_address(
        &self,
        index: u32,
        standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<Address, PortError> {
        Ok(self.key(index, standard)?.address())
    }

    async fn get_address_list(
        &self,
        _start: u32,
        _count: u32,
        _address_prefix: &str,
        _standard: DerivationStandard,
    ) -> Result<Vec<String>, PortError> {
        Err(PortError::NotImplemented("tendermint addresses"))
    }

    async fn get_eth_address_list(
        &self,
        start: u32,
        count: u32,
        standard: DerivationStandard,
    ) -> Result<Vec<Address>, PortError> {
        (start..start.saturating_add(count))
            .map(|index| self.key(index, standard).map(|k| k.address()))
            .collect()
    }

    async fn get_pub_key(
        &self,
        index: u32,
        standard: DerivationStandard,
        _confirm_on_device: bool,
    ) -> Result<Bytes, PortError> {
        let key = self.key(index, standard)?;
        let point = key.credential().verifying_key().to_encoded_point(true);
        Ok(Bytes::copy_from_slice(point.as_bytes()))
    }

    async fn sign_transaction(
        &self,
        chain: &ChainConfig,
        transaction: &UnsignedEvmTransaction,
        secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.check_secret(secret)?;
        if transaction.chain_id != chain.chain_id {
            return Err(PortError::Validation(format!(
                "transaction for chain {} cannot be signed on {}",
                transaction.chain_id, chain.chain_id
            )));
        }
        let key = self.key_for(transaction.from)?;
        let gas_limit = u64::try_from(transaction.gas_limit)
            .map_err(|e| PortError::Validation(format!("gas limit out of range: {e}")))?;
        let value = transaction.value.unwrap_or(U256::ZERO);

        let envelope: TxEnvelope = match (
            transaction.max_fee_per_gas,
            transaction.max_priority_fee_per_gas,
        ) {
            (Some(max_fee), Some(priority)) => {
                let tx = TxEip1559 {
                    chain_id: transaction.chain_id.0,
                    nonce: transaction.nonce,
                    gas_limit,
                    max_fee_per_gas: to_u128(max_fee, "max fee")?,
                    max_priority_fee_per_gas: to_u128(priority, "priority fee")?,
                    to: TxKind::Call(transaction.to),
                    value,
                    input: transaction.data.clone(),
                    ..Default::default()
                };
                let signature = sign_hash(&key, tx.signature_hash())?;
                tx.into_signed(signature).into()
            }
            _ => {
                let tx = TxLegacy {
                    chain_id: Some(transaction.chain_id.0),
                    nonce: transaction.nonce,
                    gas_price: to_u128(transaction.gas_price, "gas price")?,
                    gas_limit,
                    to: TxKind::Call(transaction.to),
                    value,
                    input: transaction.data.clone(),
                };
                let signature = sign_hash(&key, tx.signature_hash())?;
                tx.into_signed(signature).into()
            }
        };
        tracing::debug!(hash = %envelope.tx_hash(), "signed transaction");
        Ok(envelope.encoded_2718().into())
    }

    async fn sign_message(
        &self,
        account: Address,
        data: &[u8],
        secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.check_secret(secret)?;
        if data.len() != 32 {
            return Err(PortError::Validation(
                "eth_sign expects a 32-byte hash".to_owned(),
            ));
        }
        let key = self.key_for(account)?;
        let signature = sign_hash(&key, B256::from_slice(data))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn sign_personal_message(
        &self,
        account: Address,
        data: &[u8],
        secret: &Secret,
    ) -> Result<Bytes, PortError> {
        self.check_secret(secret)?;
        let key = self.key_for(account)?;
        let signature = key
            .sign_message_sync(data)
            .map_err(|e| PortError::Validation(format!("signing failed: {e}")))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn sign_typed_data_v4(
        &self,
        _account: Address,
        _typed_data: &str,
        _secret: &Secret,
    ) -> Result<Bytes, PortError> {
        Err(PortError::NotImplemented("typed data signing"))
    }

    async fn ec_recover(&self, message: &[u8], signature: &Bytes) -> Result<Address, PortError> {
        let signature = PrimitiveSignature::try_from(&signature[..])
            .map_err(|e| PortError::Validation(format!("invalid signature: {e}")))?;
        signature
            .recover_address_from_msg(message)
            .map_err(|e| PortError::Validation(format!("recovery failed: {e}")))
    }
}

fn sign_hash(
    key: &PrivateKeySigner,
    hash: B256,
) -> Result<PrimitiveSignature, PortError> {
    key.sign_hash_sync(&hash)
        .map_err(|e| PortError::Validation(format!("signing failed: {e}")))
}

fn to_u128(value: U256, what: &str) -> Result<u128, PortError> {
    u128::try_from(value).map_err(|e| PortError::Validation(format!("{what} out of range: {e}")))
}
