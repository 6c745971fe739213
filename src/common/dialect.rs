use std::fmt;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = match url.split_once(':') {
            Some((scheme, _)) => scheme.to_lowercase(),
            None => bail!("Database url has no scheme: {}", url),
        };

        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => bail!("Unsupported database scheme: {}", other),
        }
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", identifier.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
        }
    }

    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", position),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether DDL statements participate in the surrounding transaction.
    pub fn transactional_ddl(&self) -> bool {
        !matches!(self, Dialect::MySql)
    }

    /// Query counting tables named by the single bound parameter.
    pub fn table_exists_query(&self) -> String {
        match self {
            Dialect::Postgres | Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
                self.current_schema(),
                self.placeholder(1)
            ),
            Dialect::Sqlite => format!(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = {}",
                self.placeholder(1)
            ),
        }
    }

    /// Query counting columns of table (first parameter) named by the second parameter.
    pub fn column_exists_query(&self) -> String {
        match self {
            Dialect::Postgres | Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = {} AND table_name = {} AND column_name = {}",
                self.current_schema(),
                self.placeholder(1),
                self.placeholder(2)
            ),
            Dialect::Sqlite => format!(
                "SELECT COUNT(*) FROM pragma_table_info({}) WHERE name = {}",
                self.placeholder(1),
                self.placeholder(2)
            ),
        }
    }

    fn current_schema(&self) -> &'static str {
        match self {
            Dialect::Postgres => "current_schema()",
            _ => "DATABASE()",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgresql"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}
