use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Upgrade => write!(f, "upgrade"),
            Direction::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// One revision to run, with the ledger rows it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub revision: &'static str,
    pub direction: Direction,
    pub removed_heads: Vec<String>,
    pub added_heads: Vec<String>,
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let from = match self.direction {
            Direction::Upgrade => self.removed_heads.join(", "),
            Direction::Downgrade => self.revision.to_string(),
        };
        let to = match self.direction {
            Direction::Upgrade => self.revision.to_string(),
            Direction::Downgrade => self.added_heads.join(", "),
        };

        write!(
            f,
            "Running {} {} -> {}",
            self.direction,
            if from.is_empty() { "<base>" } else { from.as_str() },
            if to.is_empty() { "<base>" } else { to.as_str() }
        )
    }
}
