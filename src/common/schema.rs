use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
        }
    }
}

/// A nullable column without a server default, to be added to an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        ColumnDefinition {
            name: name.to_string(),
            column_type,
        }
    }

    pub fn integer(name: &str) -> Self {
        ColumnDefinition::new(name, ColumnType::Integer)
    }
}
