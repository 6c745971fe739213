use std::fmt;
use std::str::FromStr;

use crate::common::errors::RevisionError;

/// Destination of an upgrade, downgrade or stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Head,
    Heads,
    Base,
    /// `+N` or `-N` steps from the single current head.
    Relative(i64),
    /// Revision id, unique id prefix or branch label.
    Revision(String),
}

impl FromStr for Target {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match s {
            "" => Err(RevisionError::InvalidTarget("empty target".to_string())),
            "head" => Ok(Target::Head),
            "heads" => Ok(Target::Heads),
            "base" => Ok(Target::Base),
            _ if s.starts_with('+') || s.starts_with('-') => {
                let steps = s
                    .parse::<i64>()
                    .map_err(|_| RevisionError::InvalidTarget(s.to_string()))?;

                if steps == 0 {
                    return Err(RevisionError::InvalidTarget(s.to_string()));
                }

                Ok(Target::Relative(steps))
            }
            _ => Ok(Target::Revision(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Head => write!(f, "head"),
            Target::Heads => write!(f, "heads"),
            Target::Base => write!(f, "base"),
            Target::Relative(steps) => write!(f, "{:+}", steps),
            Target::Revision(name) => write!(f, "{}", name),
        }
    }
}
