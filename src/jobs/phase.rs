use std::fmt;

use serde::{Deserialize, Serialize};

/// Phases a watched job moves through on the client side.
///
/// IDLE → SUBMITTING → POLLING → RESOLVING → COMPLETED, with FAILED,
/// TIMED_OUT and CANCELLED as the other terminal phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    Resolving,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::Failed | Phase::TimedOut | Phase::Cancelled
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Submitting => write!(f, "SUBMITTING"),
            Phase::Polling => write!(f, "POLLING"),
            Phase::Resolving => write!(f, "RESOLVING"),
            Phase::Completed => write!(f, "COMPLETED"),
            Phase::Failed => write!(f, "FAILED"),
            Phase::TimedOut => write!(f, "TIMED_OUT"),
            Phase::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Phase,
    pub to: Phase,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid phase transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Tracks the current phase and its history, rejecting illegal moves.
///
/// Terminal phases have no outgoing edges, so a job can reach at most one
/// terminal outcome.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: Phase,
    history: Vec<Phase>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(Phase::Idle)
    }
}

impl PhaseMachine {
    pub fn new(start: Phase) -> Self {
        Self {
            phase: start,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase visited, current one last.
    pub fn transitions(&self) -> Vec<Phase> {
        let mut all = self.history.clone();
        all.push(self.phase);
        all
    }

    pub fn allowed(from: Phase, to: Phase) -> bool {
        use Phase::*;
        match (from, to) {
            (Idle, Submitting) | (Idle, Polling) => true,
            (Submitting, Polling) | (Submitting, Failed) | (Submitting, Cancelled) => true,
            (Polling, Resolving) | (Polling, Failed) | (Polling, TimedOut) | (Polling, Cancelled) => {
                true
            }
            (Resolving, Completed) | (Resolving, Failed) | (Resolving, Cancelled) => true,
            _ => false,
        }
    }

    pub fn advance(&mut self, to: Phase) -> Result<(), InvalidTransition> {
        if !Self::allowed(self.phase, to) {
            return Err(InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.history.push(self.phase);
        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_all_phases() {
        let mut m = PhaseMachine::default();
        m.advance(Phase::Submitting).unwrap();
        m.advance(Phase::Polling).unwrap();
        m.advance(Phase::Resolving).unwrap();
        m.advance(Phase::Completed).unwrap();
        assert_eq!(
            m.transitions(),
            vec![
                Phase::Idle,
                Phase::Submitting,
                Phase::Polling,
                Phase::Resolving,
                Phase::Completed
            ]
        );
        assert!(m.phase().is_terminal());
    }

    #[test]
    fn terminal_phases_are_final() {
        for terminal in [Phase::Completed, Phase::Failed, Phase::TimedOut, Phase::Cancelled] {
            let mut m = PhaseMachine::new(terminal);
            for next in [Phase::Polling, Phase::Resolving, Phase::Completed, Phase::Failed] {
                assert_eq!(
                    m.advance(next),
                    Err(InvalidTransition { from: terminal, to: next })
                );
            }
        }
    }

    #[test]
    fn cannot_skip_polling() {
        let mut m = PhaseMachine::new(Phase::Submitting);
        assert!(m.advance(Phase::Resolving).is_err());
        assert!(m.advance(Phase::TimedOut).is_err());
        assert_eq!(m.phase(), Phase::Submitting);
    }

    #[test]
    fn watching_existing_job_starts_at_polling() {
        let mut m = PhaseMachine::default();
        m.advance(Phase::Polling).unwrap();
        m.advance(Phase::TimedOut).unwrap();
        assert_eq!(m.transitions(), vec![Phase::Idle, Phase::Polling, Phase::TimedOut]);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(Phase::Resolving.to_string(), "RESOLVING");
        assert_eq!(
            InvalidTransition { from: Phase::Completed, to: Phase::Failed }.to_string(),
            "invalid phase transition COMPLETED -> FAILED"
        );
    }
}
