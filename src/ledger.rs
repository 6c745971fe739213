use crate::common::dialect::Dialect;
use crate::common::errors::SchemaError;
use crate::edit::editor::SchemaEditor;
use crate::edit::query::{
    build_create_version_table, build_delete_all_versions, build_delete_version,
    build_insert_version, build_select_versions, build_update_version,
};

pub const DEFAULT_VERSION_TABLE: &str = "alembic_version";

/// Persisted record of the revisions currently applied, one row per head.
#[derive(Debug, Clone)]
pub struct VersionLedger {
    table_name: String,
    dialect: Dialect,
}

impl VersionLedger {
    pub fn new(table_name: &str, dialect: Dialect) -> Self {
        VersionLedger {
            table_name: table_name.to_string(),
            dialect,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn ensure(&self, editor: &mut SchemaEditor<'_>) -> Result<(), SchemaError> {
        let query = build_create_version_table(self.dialect, &self.table_name);
        editor.execute(&query).await
    }

    /// Current heads; a database without the ledger table has none.
    pub async fn heads(&self, editor: &mut SchemaEditor<'_>) -> Result<Vec<String>, SchemaError> {
        if !editor.table_exists(&self.table_name).await? {
            return Ok(Vec::new());
        }

        let query = build_select_versions(self.dialect, &self.table_name);
        let mut heads = editor.fetch_strings(&query).await?;
        heads.sort();

        Ok(heads)
    }

    pub async fn replace(
        &self,
        editor: &mut SchemaEditor<'_>,
        removed: &[String],
        added: &[String],
    ) -> Result<(), SchemaError> {
        if let ([from], [to]) = (removed, added) {
            let query = build_update_version(self.dialect, &self.table_name, from, to);
            return editor.execute(&query).await;
        }

        for revision in removed {
            let query = build_delete_version(self.dialect, &self.table_name, revision);
            editor.execute(&query).await?;
        }

        for revision in added {
            let query = build_insert_version(self.dialect, &self.table_name, revision);
            editor.execute(&query).await?;
        }

        Ok(())
    }

    /// Drops every row and records exactly `heads`.
    pub async fn reset(
        &self,
        editor: &mut SchemaEditor<'_>,
        heads: &[&str],
    ) -> Result<(), SchemaError> {
        let query = build_delete_all_versions(self.dialect, &self.table_name);
        editor.execute(&query).await?;

        for revision in heads {
            let query = build_insert_version(self.dialect, &self.table_name, revision);
            editor.execute(&query).await?;
        }

        Ok(())
    }
}
