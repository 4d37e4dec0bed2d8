use crate::error::BridgeError;
use crate::hardware::HardwareErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareState {
    Idle,
    AwaitingPrimaryApp,
    PrimaryAppReady,
    AwaitingSecondaryApp,
    SecondaryAppReady,
    Done,
    Error(HardwareErrorKind),
}

impl HardwareState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareAction {
    RequestPrimary,
    PrimaryReady,
    RequestSecondary,
    SecondaryReady,
    Finish,
    Fail(HardwareErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: HardwareState,
    pub to: HardwareState,
    pub action: HardwareAction,
}

pub fn hardware_transition(
    state: HardwareState,
    action: HardwareAction,
) -> Result<(HardwareState, StateTransition), BridgeError> {
    use HardwareAction as A;
    use HardwareState as S;

    let next = match (state, action) {
        (S::Idle, A::RequestPrimary) => S::AwaitingPrimaryApp,
        (S::AwaitingPrimaryApp, A::PrimaryReady) => S::PrimaryAppReady,
        (S::PrimaryAppReady, A::RequestSecondary) => S::AwaitingSecondaryApp,
        (S::AwaitingSecondaryApp, A::SecondaryReady) => S::SecondaryAppReady,
        (S::PrimaryAppReady | S::SecondaryAppReady, A::Finish) => S::Done,
        (s, A::Fail(kind)) if !s.is_terminal() => S::Error(kind),
        (from, action) => {
            return Err(BridgeError::IllegalTransition(format!(
                "{from:?} on {action:?}"
            )))
        }
    };
    Ok((
        next,
        StateTransition {
            from: state,
            to: next,
            action,
        },
    ))
}
