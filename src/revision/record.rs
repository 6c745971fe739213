use std::fmt;

use async_trait::async_trait;

use crate::common::errors::SchemaError;
use crate::edit::editor::SchemaEditor;

/// Identity of one migration script within the revision history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: &'static str,
    /// Structural predecessors. Empty for a root, several for a merge point.
    pub down_revision: &'static [&'static str],
    pub branch_labels: &'static [&'static str],
    /// Revisions or branch labels that must be applied first without being predecessors.
    pub depends_on: &'static [&'static str],
    pub message: &'static str,
    pub create_date: &'static str,
}

impl Revision {
    pub fn is_root(&self) -> bool {
        self.down_revision.is_empty()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let down = match self.down_revision {
            [] => "<base>".to_string(),
            [single] => single.to_string(),
            many => format!("({})", many.join(", ")),
        };

        write!(f, "{} -> {}", down, self.id)?;

        if !self.branch_labels.is_empty() {
            write!(f, " ({})", self.branch_labels.join(", "))?;
        }

        write!(f, ", {}", self.message)
    }
}

/// A schema migration: one revision with its forward and reverse procedures.
#[async_trait]
pub trait Migration: Send + Sync {
    fn revision(&self) -> &Revision;

    async fn upgrade(&self, op: &mut SchemaEditor<'_>) -> Result<(), SchemaError>;

    async fn downgrade(&self, op: &mut SchemaEditor<'_>) -> Result<(), SchemaError>;
}
