//! Human-in-the-loop sequencing for hardware signers that expose one app at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::HardwareOptions;
use crate::error::BridgeError;
use crate::family::{AssetFamily, DerivationStandard, DerivedAddress};
use crate::ports::{PortError, SignerPort};
use crate::state_machine::{hardware_transition, HardwareAction, HardwareState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum HardwareErrorKind {
    #[error("device timed out waiting for app")]
    DeviceTimeout,
    #[error("device conditions not met")]
    DeviceConditionsNotMet,
    #[error("device unreachable")]
    DeviceUnreachable,
    #[error("cancelled by user")]
    Cancelled,
}

impl HardwareErrorKind {
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::DeviceConditionsNotMet => {
                "Please unlock your hardware wallet and open the requested app, then try again."
            }
            Self::DeviceUnreachable | Self::DeviceTimeout => {
                "Cannot reach your hardware wallet. Check the connection, unlock the device and try again."
            }
            Self::Cancelled => "Hardware wallet operation cancelled.",
        }
    }
}

pub fn classify_device_error(message: &str, condition_patterns: &[String]) -> HardwareErrorKind {
    let lowered = message.to_ascii_lowercase();
    if condition_patterns
        .iter()
        .any(|p| lowered.contains(&p.to_ascii_lowercase()))
    {
        HardwareErrorKind::DeviceConditionsNotMet
    } else {
        HardwareErrorKind::DeviceUnreachable
    }
}

/// Cloneable cancellation flag for one flow. The UI keeps a clone; the coordinator
/// checks it at every poll iteration and state transition.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    cancelled: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct HardwareSession {
    state: HardwareState,
    expected_app: Option<AssetFamily>,
    handle: SessionHandle,
    attempts_used: u32,
    primary: Option<DerivedAddress>,
    secondary: Option<DerivedAddress>,
}

impl Default for HardwareSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareSession {
    pub fn new() -> Self {
        Self {
            state: HardwareState::Idle,
            expected_app: None,
            handle: SessionHandle::default(),
            attempts_used: 0,
            primary: None,
            secondary: None,
        }
    }

    pub fn state(&self) -> HardwareState {
        self.state
    }

    pub fn expected_app(&self) -> Option<&AssetFamily> {
        self.expected_app.as_ref()
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Poll attempts spent waiting for the secondary app.
    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn primary(&self) -> Option<&DerivedAddress> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&DerivedAddress> {
        self.secondary.as_ref()
    }

    /// Caller-level cancel: back to `Idle` with results and flags cleared.
    pub fn reset(&mut self) {
        self.state = HardwareState::Idle;
        self.expected_app = None;
        self.handle.clear();
        self.attempts_used = 0;
        self.primary = None;
        self.secondary = None;
    }

    fn apply(&mut self, action: HardwareAction) -> Result<(), BridgeError> {
        let (next, transition) = hardware_transition(self.state, action)?;
        tracing::debug!(from = ?transition.from, to = ?transition.to, "hardware session transition");
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, kind: HardwareErrorKind) -> BridgeError {
        if let Err(err) = self.apply(HardwareAction::Fail(kind)) {
            return err;
        }
        self.expected_app = None;
        BridgeError::Hardware(kind)
    }

    /// Cancellation is honored at every transition.
    fn advance(&mut self, action: HardwareAction) -> Result<(), BridgeError> {
        if self.is_cancelled() {
            return Err(self.fail(HardwareErrorKind::Cancelled));
        }
        self.apply(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAddressPlan {
    pub primary: AssetFamily,
    pub secondary: Option<AssetFamily>,
    pub index: u32,
    pub standard: DerivationStandard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAddresses {
    pub primary: DerivedAddress,
    pub secondary: Option<DerivedAddress>,
}

pub struct HardwareCoordinator<'a, S> {
    signer: &'a S,
    options: &'a HardwareOptions,
}

impl<'a, S: SignerPort> HardwareCoordinator<'a, S> {
    pub fn new(signer: &'a S, options: &'a HardwareOptions) -> Self {
        Self { signer, options }
    }

    fn classify(&self, err: &PortError) -> HardwareErrorKind {
        self.options.classify(&err.to_string())
    }

    /// Single-app check before a hardware-backed signing operation.
    pub async fn ensure_app(
        &self,
        session: &mut HardwareSession,
        family: &AssetFamily,
        index: u32,
        standard: DerivationStandard,
    ) -> Result<(), BridgeError> {
        session.advance(HardwareAction::RequestPrimary)?;
        session.expected_app = Some(family.clone());

        if let Err(err) = family.probe(self.signer, index, standard).await {
            let kind = self.classify(&err);
            tracing::warn!(family = family.name(), error = %err, ?kind, "hardware app check failed");
            return Err(session.fail(kind));
        }

        session.advance(HardwareAction::PrimaryReady)?;
        session.advance(HardwareAction::Finish)?;
        session.expected_app = None;
        Ok(())
    }

    /// Multi-app address collection for wallet creation. The secondary address is not
    /// requested until the primary has succeeded. On failure the primary result stays on
    /// the session.
    pub async fn collect_wallet_addresses(
        &self,
        session: &mut HardwareSession,
        plan: &WalletAddressPlan,
    ) -> Result<WalletAddresses, BridgeError> {
        session.advance(HardwareAction::RequestPrimary)?;
        session.expected_app = Some(plan.primary.clone());

        let primary = match plan
            .primary
            .derive_address(self.signer, plan.index, plan.standard, false)
            .await
        {
            Ok(address) => address,
            Err(err) => {
                let kind = self.classify(&err);
                tracing::warn!(family = plan.primary.name(), error = %err, ?kind, "primary app address failed");
                return Err(session.fail(kind));
            }
        };
        session.primary = Some(primary.clone());
        session.advance(HardwareAction::PrimaryReady)?;

        let Some(secondary_family) = &plan.secondary else {
            session.advance(HardwareAction::Finish)?;
            session.expected_app = None;
            return Ok(WalletAddresses {
                primary,
                secondary: None,
            });
        };

        session.advance(HardwareAction::RequestSecondary)?;
        session.expected_app = Some(secondary_family.clone());
        let secondary = self
            .await_secondary_app(session, secondary_family, plan)
            .await?;
        session.secondary = Some(secondary.clone());

        session.advance(HardwareAction::SecondaryReady)?;
        session.advance(HardwareAction::Finish)?;
        session.expected_app = None;
        Ok(WalletAddresses {
            primary,
            secondary: Some(secondary),
        })
    }

    // Polls quietly until the user opens the secondary app. A wrong-app answer means
    // "not yet"; any other device failure ends the wait.
    async fn await_secondary_app(
        &self,
        session: &mut HardwareSession,
        family: &AssetFamily,
        plan: &WalletAddressPlan,
    ) -> Result<DerivedAddress, BridgeError> {
        let policy = self.options.poll;
        for attempt in 1..=policy.max_attempts {
            if session.is_cancelled() {
                tracing::info!(attempt, "secondary app wait cancelled");
                return Err(session.fail(HardwareErrorKind::Cancelled));
            }
            session.attempts_used = attempt;

            match family
                .derive_address(self.signer, plan.index, plan.standard, false)
                .await
            {
                Ok(address) => return Ok(address),
                Err(err) => match self.classify(&err) {
                    HardwareErrorKind::DeviceConditionsNotMet => {}
                    kind => {
                        tracing::warn!(attempt, error = %err, "device failed while waiting for app");
                        return Err(session.fail(kind));
                    }
                },
            }

            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }
        tracing::warn!(
            attempts = policy.max_attempts,
            family = family.name(),
            "gave up waiting for app"
        );
        Err(session.fail(HardwareErrorKind::DeviceTimeout))
    }

    /// Address-index browsing for picking an account on the device.
    pub async fn list_addresses(
        &self,
        family: &AssetFamily,
        start: u32,
        count: u32,
        standard: DerivationStandard,
    ) -> Result<Vec<DerivedAddress>, BridgeError> {
        family
            .derive_address_list(self.signer, start, count, standard)
            .await
            .map_err(|err| BridgeError::Hardware(self.classify(&err)))
    }
}
