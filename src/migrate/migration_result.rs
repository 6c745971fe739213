use std::time::Duration;

use crate::revision::plan::Direction;

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub revision: String,
    pub direction: Direction,
    pub elapsed: Duration,
}
