use serde::{Deserialize, Serialize};

use crate::ports::{PortError, SignerPort};

const TENDERMINT_COIN_TYPE: u32 = 394;
const EVM_COIN_TYPE: u32 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivationStandard {
    #[default]
    Bip44,
    LedgerLive,
}

/// One device app per family. All family-specific signer calls go through here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AssetFamily {
    #[serde(rename_all = "camelCase")]
    Tendermint { address_prefix: String },
    Evm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAddress {
    pub family: AssetFamily,
    pub index: u32,
    pub address: String,
    pub derivation_path: String,
}

impl AssetFamily {
    pub fn tendermint(address_prefix: impl Into<String>) -> Self {
        Self::Tendermint {
            address_prefix: address_prefix.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tendermint { .. } => "tendermint",
            Self::Evm => "evm",
        }
    }

    pub fn coin_type(&self) -> u32 {
        match self {
            Self::Tendermint { .. } => TENDERMINT_COIN_TYPE,
            Self::Evm => EVM_COIN_TYPE,
        }
    }

    pub fn derivation_path(&self, index: u32, standard: DerivationStandard) -> String {
        let coin = self.coin_type();
        match standard {
            DerivationStandard::Bip44 => format!("m/44'/{coin}'/0'/0/{index}"),
            DerivationStandard::LedgerLive => format!("m/44'/{coin}'/{index}'/0/0"),
        }
    }

    pub async fn derive_address<S: SignerPort>(
        &self,
        signer: &S,
        index: u32,
        standard: DerivationStandard,
        confirm_on_device: bool,
    ) -> Result<DerivedAddress, PortError> {
        let address = match self {
            Self::Tendermint { address_prefix } => {
                signer
                    .get_address(index, address_prefix, standard, confirm_on_device)
                    .await?
            }
            Self::Evm => signer
                .get_eth_address(index, standard, confirm_on_device)
                .await?
                .to_string(),
        };
        Ok(DerivedAddress {
            family: self.clone(),
            index,
            address,
            derivation_path: self.derivation_path(index, standard),
        })
    }

    pub async fn derive_address_list<S: SignerPort>(
        &self,
        signer: &S,
        start: u32,
        count: u32,
        standard: DerivationStandard,
    ) -> Result<Vec<DerivedAddress>, PortError> {
        let addresses = match self {
            Self::Tendermint { address_prefix } => {
                signer
                    .get_address_list(start, count, address_prefix, standard)
                    .await?
            }
            Self::Evm => signer
                .get_eth_address_list(start, count, standard)
                .await?
                .into_iter()
                .map(|a| a.to_string())
                .collect(),
        };
        Ok(addresses
            .into_iter()
            .zip(start..)
            .map(|(address, index)| DerivedAddress {
                family: self.clone(),
                index,
                address,
                derivation_path: self.derivation_path(index, standard),
            })
            .collect())
    }

    /// Cheap device check that succeeds only when this family's app is open.
    pub async fn probe<S: SignerPort>(
        &self,
        signer: &S,
        index: u32,
        standard: DerivationStandard,
    ) -> Result<(), PortError> {
        match self {
            Self::Tendermint { .. } => signer.get_pub_key(index, standard, false).await.map(|_| ()),
            Self::Evm => signer.get_eth_address(index, standard, false).await.map(|_| ()),
        }
    }
}
