use sqlx::any::AnyConnection;
use sqlx::{Any, Executor};

use crate::common::dialect::Dialect;
use crate::common::errors::SchemaError;
use crate::common::schema::ColumnDefinition;
use crate::edit::query::{build_add_column, build_drop_column};

enum Sink<'c> {
    Online(&'c mut AnyConnection),
    Offline(&'c mut Vec<String>),
}

/// Schema editing capability handed to migration scripts.
///
/// Online editors run statements on a connection (normally one inside an open
/// transaction) and check the live schema first. Offline editors only record
/// the statements they would have run.
pub struct SchemaEditor<'c> {
    sink: Sink<'c>,
    dialect: Dialect,
}

impl<'c> SchemaEditor<'c> {
    pub fn online(connection: &'c mut AnyConnection, dialect: Dialect) -> Self {
        SchemaEditor {
            sink: Sink::Online(connection),
            dialect,
        }
    }

    pub fn offline(statements: &'c mut Vec<String>, dialect: Dialect) -> Self {
        SchemaEditor {
            sink: Sink::Offline(statements),
            dialect,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.sink, Sink::Offline(_))
    }

    pub async fn add_column(
        &mut self,
        table_name: &str,
        column: ColumnDefinition,
    ) -> Result<(), SchemaError> {
        if !self.is_offline() {
            if !self.table_exists(table_name).await? {
                return Err(SchemaError::TableMissing {
                    table: table_name.to_string(),
                });
            }

            if self.column_exists(table_name, &column.name).await? {
                return Err(SchemaError::ColumnExists {
                    table: table_name.to_string(),
                    column: column.name,
                });
            }
        }

        debug!("Adding column {}.{}", table_name, column.name);

        let query = build_add_column(self.dialect, table_name, &column);
        self.execute(&query).await
    }

    pub async fn drop_column(
        &mut self,
        table_name: &str,
        column_name: &str,
    ) -> Result<(), SchemaError> {
        if !self.is_offline() && !self.column_exists(table_name, column_name).await? {
            return Err(SchemaError::ColumnMissing {
                table: table_name.to_string(),
                column: column_name.to_string(),
            });
        }

        debug!("Dropping column {}.{}", table_name, column_name);

        let query = build_drop_column(self.dialect, table_name, column_name);
        self.execute(&query).await
    }

    pub async fn execute(&mut self, query: &str) -> Result<(), SchemaError> {
        match &mut self.sink {
            Sink::Online(connection) => {
                let connection: &mut AnyConnection = connection;
                connection
                    .execute(query)
                    .await
                    .map_err(|err| SchemaError::from_sqlx(query, err))?;
            }
            Sink::Offline(statements) => statements.push(query.to_string()),
        }

        Ok(())
    }

    pub async fn table_exists(&mut self, table_name: &str) -> Result<bool, SchemaError> {
        let query = self.dialect.table_exists_query();
        self.count(&query, &[table_name]).await.map(|count| count > 0)
    }

    pub async fn column_exists(
        &mut self,
        table_name: &str,
        column_name: &str,
    ) -> Result<bool, SchemaError> {
        let query = self.dialect.column_exists_query();
        self.count(&query, &[table_name, column_name])
            .await
            .map(|count| count > 0)
    }

    /// Reads the first column of every row returned by `query`.
    ///
    /// Offline editors have nothing to read and return no rows.
    pub async fn fetch_strings(&mut self, query: &str) -> Result<Vec<String>, SchemaError> {
        match &mut self.sink {
            Sink::Online(connection) => {
                let connection: &mut AnyConnection = connection;
                sqlx::query_scalar::<Any, String>(query)
                    .fetch_all(connection)
                    .await
                    .map_err(|err| SchemaError::from_sqlx(query, err))
            }
            Sink::Offline(_) => Ok(Vec::new()),
        }
    }

    async fn count(&mut self, query: &str, params: &[&str]) -> Result<i64, SchemaError> {
        match &mut self.sink {
            Sink::Online(connection) => {
                let connection: &mut AnyConnection = connection;
                let mut scalar = sqlx::query_scalar::<Any, i64>(query);
                for param in params {
                    scalar = scalar.bind(*param);
                }

                scalar
                    .fetch_one(connection)
                    .await
                    .map_err(|err| SchemaError::from_sqlx(query, err))
            }
            Sink::Offline(_) => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_helpers::{column_names, memory_pool};

    #[tokio::test]
    async fn adds_and_drops_columns() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE products (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let mut connection = pool.acquire().await.unwrap();
        let mut editor = SchemaEditor::online(&mut connection, Dialect::Sqlite);

        editor
            .add_column("products", ColumnDefinition::integer("name"))
            .await
            .unwrap();
        assert!(editor.column_exists("products", "name").await.unwrap());

        editor.drop_column("products", "name").await.unwrap();
        assert!(!editor.column_exists("products", "name").await.unwrap());

        drop(connection);
        assert_eq!(column_names(&pool, "products").await, vec!["id"]);
    }

    #[tokio::test]
    async fn rejects_duplicate_and_missing_columns() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE products (id INTEGER PRIMARY KEY, name INTEGER)")
            .execute(&pool)
            .await
            .unwrap();

        let mut connection = pool.acquire().await.unwrap();
        let mut editor = SchemaEditor::online(&mut connection, Dialect::Sqlite);

        let err = editor
            .add_column("products", ColumnDefinition::integer("name"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::ColumnExists { .. }));

        let err = editor.drop_column("products", "price").await.unwrap_err();
        assert!(matches!(err, SchemaError::ColumnMissing { .. }));

        let err = editor
            .add_column("missing", ColumnDefinition::integer("seats"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::TableMissing { .. }));
    }

    #[tokio::test]
    async fn offline_editor_records_statements() {
        let mut statements = Vec::new();
        let mut editor = SchemaEditor::offline(&mut statements, Dialect::Postgres);

        editor
            .add_column("product_prices", ColumnDefinition::integer("min_seats"))
            .await
            .unwrap();
        editor
            .drop_column("product_prices", "min_seats")
            .await
            .unwrap();
        assert!(editor.fetch_strings("SELECT 1").await.unwrap().is_empty());

        assert_eq!(
            statements,
            vec![
                r#"ALTER TABLE "product_prices" ADD COLUMN "min_seats" INTEGER"#.to_string(),
                r#"ALTER TABLE "product_prices" DROP COLUMN "min_seats""#.to_string(),
            ]
        );
    }
}
