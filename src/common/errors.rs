use thiserror::Error;

/// Failures raised while editing the schema or the version ledger.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Column {table}.{column} already exists")]
    ColumnExists { table: String, column: String },

    #[error("Column {table}.{column} does not exist")]
    ColumnMissing { table: String, column: String },

    #[error("Table {table} does not exist")]
    TableMissing { table: String },

    #[error("Database is unreachable")]
    Connectivity(#[source] sqlx::Error),

    #[error("Cannot execute statement: {statement}")]
    Statement {
        statement: String,
        #[source]
        source: sqlx::Error,
    },
}

impl SchemaError {
    /// Conflicts between the requested change and the current schema.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SchemaError::ColumnExists { .. }
                | SchemaError::ColumnMissing { .. }
                | SchemaError::TableMissing { .. }
        )
    }

    pub fn from_sqlx(statement: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => SchemaError::Connectivity(err),
            source => SchemaError::Statement {
                statement: preview(statement),
                source,
            },
        }
    }
}

/// Failures raised while validating the revision history or resolving a target.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevisionError {
    #[error("Revision {0} is defined more than once")]
    DuplicateRevision(String),

    #[error("Branch label {0} is already used by another revision")]
    DuplicateBranchLabel(String),

    #[error("Revision {revision} depends on unknown revision {dependency}")]
    UnresolvedDependency { revision: String, dependency: String },

    #[error("Revision history contains a cycle through: {0}")]
    Cycle(String),

    #[error("No such revision or branch: {0}")]
    UnknownRevision(String),

    #[error("Revision prefix {prefix} is ambiguous: {candidates}")]
    AmbiguousRevision { prefix: String, candidates: String },

    #[error("Database is stamped with revision {0}, which is not part of this history")]
    UnknownLedgerRevision(String),

    #[error("Multiple heads present: {0}; name a revision or use 'heads'")]
    MultipleHeads(String),

    #[error("Revision {0} has more than one path to step through")]
    AmbiguousStep(String),

    #[error("Relative step {0} goes beyond the known history")]
    RelativeOutOfRange(i64),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Revision {0} is defined elsewhere and has not been applied; stamp the database first")]
    AnchorNotApplied(String),

    #[error("Revision {0} is not an ancestor of the current database state")]
    NotAnAncestor(String),
}

fn preview(statement: &str) -> String {
    if statement.is_empty() {
        "EMPTY QUERY".to_string()
    } else {
        statement.chars().take(100).collect()
    }
}
