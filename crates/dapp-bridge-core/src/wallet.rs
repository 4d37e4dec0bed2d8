use thiserror::Error;

use crate::domain::WalletAsset;
use crate::error::BridgeError;
use crate::family::DerivedAddress;
use crate::hardware::{
    HardwareCoordinator, HardwareErrorKind, HardwareSession, WalletAddressPlan,
};
use crate::ports::{PersistencePort, SignerPort};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareWalletRequest {
    pub wallet_id: String,
    pub plan: WalletAddressPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedWallet {
    pub wallet_id: String,
    pub assets: Vec<WalletAsset>,
    /// False when the user stopped waiting for the secondary app and only the
    /// primary family was saved.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to create wallet. {remediation}")]
pub struct WalletCreationError {
    pub remediation: String,
    pub source_error: BridgeError,
}

impl WalletCreationError {
    fn new(source_error: BridgeError) -> Self {
        let remediation = match &source_error {
            BridgeError::Hardware(kind) => kind.remediation().to_owned(),
            _ => "Please try again.".to_owned(),
        };
        Self {
            remediation,
            source_error,
        }
    }
}

/// Derives the planned addresses on the device and saves them as wallet assets.
///
/// Cancelling the secondary-app wait keeps the primary address: it is saved on its own and
/// the wallet is reported incomplete. Every other failure resets `session` to `Idle`.
pub async fn create_hardware_wallet<S, W>(
    coordinator: &HardwareCoordinator<'_, S>,
    persistence: &W,
    session: &mut HardwareSession,
    request: &HardwareWalletRequest,
) -> Result<CreatedWallet, WalletCreationError>
where
    S: SignerPort,
    W: PersistencePort,
{
    let (addresses, complete) = match coordinator
        .collect_wallet_addresses(session, &request.plan)
        .await
    {
        Ok(collected) => {
            let mut addresses = vec![collected.primary];
            addresses.extend(collected.secondary);
            (addresses, true)
        }
        Err(BridgeError::Hardware(HardwareErrorKind::Cancelled)) if session.primary().is_some() => {
            let primary = session.primary().cloned().into_iter().collect();
            tracing::info!(wallet_id = %request.wallet_id, "secondary app wait cancelled; saving primary only");
            (primary, false)
        }
        Err(err) => {
            tracing::warn!(wallet_id = %request.wallet_id, error = %err, "hardware wallet creation failed");
            session.reset();
            return Err(WalletCreationError::new(err));
        }
    };

    let assets = to_assets(&request.wallet_id, addresses);
    if let Err(err) = persistence.save_assets(&assets).await {
        tracing::warn!(wallet_id = %request.wallet_id, error = %err, "saving wallet assets failed");
        session.reset();
        return Err(WalletCreationError::new(BridgeError::Persistence(
            err.to_string(),
        )));
    }

    tracing::info!(
        wallet_id = %request.wallet_id,
        assets = assets.len(),
        complete,
        "hardware wallet created"
    );
    session.reset();
    Ok(CreatedWallet {
        wallet_id: request.wallet_id.clone(),
        assets,
        complete,
    })
}

fn to_assets(wallet_id: &str, addresses: Vec<DerivedAddress>) -> Vec<WalletAsset> {
    addresses
        .into_iter()
        .map(|derived| WalletAsset::Account {
            wallet_id: wallet_id.to_owned(),
            family: derived.family,
            address: derived.address,
            derivation_path: derived.derivation_path,
        })
        .collect()
}
