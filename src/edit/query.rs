use crate::common::dialect::Dialect;
use crate::common::helpers::quote_literal;
use crate::common::schema::ColumnDefinition;

pub const VERSION_COLUMN: &str = "version_num";
const VERSION_COLUMN_LENGTH: u32 = 128;

pub fn build_add_column(dialect: Dialect, table_name: &str, column: &ColumnDefinition) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        dialect.quote_identifier(table_name),
        dialect.quote_identifier(&column.name),
        column.column_type
    )
}

pub fn build_drop_column(dialect: Dialect, table_name: &str, column_name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        dialect.quote_identifier(table_name),
        dialect.quote_identifier(column_name)
    )
}

pub fn build_create_version_table(dialect: Dialect, table_name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR({}) NOT NULL, CONSTRAINT {} PRIMARY KEY ({}))",
        dialect.quote_identifier(table_name),
        VERSION_COLUMN,
        VERSION_COLUMN_LENGTH,
        dialect.quote_identifier(&format!("{}_pkc", table_name)),
        VERSION_COLUMN
    )
}

pub fn build_select_versions(dialect: Dialect, table_name: &str) -> String {
    format!(
        "SELECT {} FROM {}",
        VERSION_COLUMN,
        dialect.quote_identifier(table_name)
    )
}

pub fn build_insert_version(dialect: Dialect, table_name: &str, revision: &str) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_identifier(table_name),
        VERSION_COLUMN,
        quote_literal(revision)
    )
}

pub fn build_update_version(dialect: Dialect, table_name: &str, from: &str, to: &str) -> String {
    format!(
        "UPDATE {} SET {} = {} WHERE {} = {}",
        dialect.quote_identifier(table_name),
        VERSION_COLUMN,
        quote_literal(to),
        VERSION_COLUMN,
        quote_literal(from)
    )
}

pub fn build_delete_version(dialect: Dialect, table_name: &str, revision: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = {}",
        dialect.quote_identifier(table_name),
        VERSION_COLUMN,
        quote_literal(revision)
    )
}

pub fn build_delete_all_versions(dialect: Dialect, table_name: &str) -> String {
    format!("DELETE FROM {}", dialect.quote_identifier(table_name))
}

/// Joins statements into a script, terminating each one except comments.
pub fn render_script(statements: &[String]) -> String {
    statements
        .iter()
        .map(|statement| {
            if statement.starts_with("--") {
                statement.clone()
            } else {
                format!("{};", statement)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
