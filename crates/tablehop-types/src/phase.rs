//! Per-hop transfer state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one hop.
///
/// `Init -> Bootstrap -> SteadyAppend* -> Done`, with any failing step moving
/// to `Failed`. `Bootstrap` is the schema replace on the relational hop and
/// the truncating first chunk on the warehouse hop. A hop with nothing to
/// move may go straight from `Init` to `Done`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    #[default]
    Init,
    Bootstrap,
    SteadyAppend,
    Done,
    Failed,
}

impl TransferPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransferPhase::{Bootstrap, Done, Failed, Init, SteadyAppend};
        match (self, next) {
            (Init, Bootstrap | Done)
            | (Bootstrap, SteadyAppend | Done)
            | (SteadyAppend, SteadyAppend | Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Bootstrap => "bootstrap",
            Self::SteadyAppend => "steady_append",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            TransferPhase::Init,
            TransferPhase::Bootstrap,
            TransferPhase::SteadyAppend,
            TransferPhase::SteadyAppend,
            TransferPhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn empty_hop_can_finish_from_init() {
        assert!(TransferPhase::Init.can_transition_to(TransferPhase::Done));
    }

    #[test]
    fn any_live_phase_can_fail() {
        for phase in [
            TransferPhase::Init,
            TransferPhase::Bootstrap,
            TransferPhase::SteadyAppend,
        ] {
            assert!(phase.can_transition_to(TransferPhase::Failed));
        }
    }

    #[test]
    fn terminal_phases_are_sticky() {
        assert!(!TransferPhase::Done.can_transition_to(TransferPhase::Failed));
        assert!(!TransferPhase::Failed.can_transition_to(TransferPhase::Init));
        assert!(!TransferPhase::Failed.can_transition_to(TransferPhase::Done));
    }

    #[test]
    fn cannot_skip_bootstrap() {
        assert!(!TransferPhase::Init.can_transition_to(TransferPhase::SteadyAppend));
    }
}
