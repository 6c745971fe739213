use crate::common::dialect::Dialect;
use crate::ledger::DEFAULT_VERSION_TABLE;

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub(crate) dialect: Dialect,
    pub(crate) version_table: String,
    pub(crate) transaction_per_migration: bool,
}

impl MigrationOptions {
    pub fn new(dialect: Dialect) -> Self {
        MigrationOptions {
            dialect,
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            transaction_per_migration: true,
        }
    }
}
