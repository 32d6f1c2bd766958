//! Per-instrument lifecycle in the live scanner.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstrumentState {
    #[default]
    Idle,
    Scanning,
    Signaled,
    AwaitingSettlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: InstrumentState,
    pub to: InstrumentState,
}

impl InstrumentState {
    pub fn can_transition_to(self, next: InstrumentState) -> bool {
        use InstrumentState::*;
        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning, Idle)
                | (Scanning, Signaled)
                | (Signaled, AwaitingSettlement)
                | (AwaitingSettlement, Idle)
        )
    }

    /// Normal-flow transition.
    pub fn transition(self, next: InstrumentState) -> Result<InstrumentState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Failure path: any state falls back to `Idle`.
    pub fn reset(self) -> InstrumentState {
        InstrumentState::Idle
    }

    pub fn is_idle(self) -> bool {
        self == InstrumentState::Idle
    }
}

impl fmt::Display for InstrumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentState::Idle => "idle",
            InstrumentState::Scanning => "scanning",
            InstrumentState::Signaled => "signaled",
            InstrumentState::AwaitingSettlement => "awaiting_settlement",
        };
        f.write_str(name)
    }
}
