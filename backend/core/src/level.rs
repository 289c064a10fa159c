use serde::{Deserialize, Serialize};

/// Granularity at which execution may proceed before a checkpoint blocks again.
///
/// Variants are declared in ascending order so the derived `Ord` matches the
/// numeric ranks: `Step < Leap < Jump < Run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeLevel {
    /// Break on every checkpoint.
    Step,
    /// Ignore step checkpoints, break on leap or coarser.
    Leap,
    /// Only jump checkpoints break.
    Jump,
    /// Never block.
    Run,
}

impl ResumeLevel {
    pub const ALL: [ResumeLevel; 4] = [Self::Step, Self::Leap, Self::Jump, Self::Run];

    /// Numeric rank; `Run` is unbounded.
    pub fn rank(self) -> u32 {
        match self {
            Self::Step => 1,
            Self::Leap => 2,
            Self::Jump => 3,
            Self::Run => u32::MAX,
        }
    }

    /// True when a checkpoint requested at `self` must wait while `current` is in effect.
    pub fn blocks_under(self, current: ResumeLevel) -> bool {
        self >= current && current != Self::Run
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Leap => "leap",
            Self::Jump => "jump",
            Self::Run => "run",
        }
    }
}

impl Default for ResumeLevel {
    fn default() -> Self {
        Self::Step
    }
}

impl std::fmt::Display for ResumeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_rank() {
        for pair in ResumeLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_blocking_predicate_table() {
        for requested in ResumeLevel::ALL {
            for current in ResumeLevel::ALL {
                let expected = requested.rank() >= current.rank() && current != ResumeLevel::Run;
                assert_eq!(
                    requested.blocks_under(current),
                    expected,
                    "requested={requested} current={current}"
                );
            }
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ResumeLevel::Leap).unwrap();
        assert_eq!(json, "\"leap\"");
        let level: ResumeLevel = serde_json::from_str("\"run\"").unwrap();
        assert_eq!(level, ResumeLevel::Run);
    }
}
