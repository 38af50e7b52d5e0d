use std::fmt;

/// Supervisor phase. Transitions are linear: `Idle → Discovering → Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Built, not yet running.
    Idle,
    /// Resolving cluster queries; no worker has started.
    Discovering,
    /// Workers and health endpoint running.
    Running,
    /// Cancellation issued; waiting for workers to finish.
    Draining,
    /// Everything finished (or the grace period ran out).
    Stopped,
}

impl Phase {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Discovering => "discovering",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        }
    }

    /// Whether `next` is the single allowed successor of `self`.
    pub fn precedes(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Discovering)
                | (Phase::Discovering, Phase::Running)
                | (Phase::Running, Phase::Draining)
                | (Phase::Draining, Phase::Stopped)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_linear() {
        let order = [
            Phase::Idle,
            Phase::Discovering,
            Phase::Running,
            Phase::Draining,
            Phase::Stopped,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].precedes(pair[1]));
            assert!(!pair[1].precedes(pair[0]));
        }
        assert!(!Phase::Running.precedes(Phase::Stopped));
        assert!(!Phase::Stopped.precedes(Phase::Idle));
    }
}
