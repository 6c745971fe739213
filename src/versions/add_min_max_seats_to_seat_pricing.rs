use async_trait::async_trait;

use crate::common::errors::SchemaError;
use crate::common::schema::ColumnDefinition;
use crate::edit::editor::SchemaEditor;
use crate::revision::record::{Migration, Revision};

const PRICES_TABLE: &str = "product_prices";

static REVISION: Revision = Revision {
    id: "add_min_max_seats_to_seat_pricing",
    down_revision: &["add_order_support_to_customer_seats"],
    branch_labels: &[],
    depends_on: &[],
    message: "add min_seats and max_seats to seat based pricing",
    create_date: "2025-10-21 01:00:00",
};

/// Seat range bounds on seat based prices. Both bounds are optional.
pub struct AddMinMaxSeatsToSeatPricing;

#[async_trait]
impl Migration for AddMinMaxSeatsToSeatPricing {
    fn revision(&self) -> &Revision {
        &REVISION
    }

    async fn upgrade(&self, op: &mut SchemaEditor<'_>) -> Result<(), SchemaError> {
        op.add_column(PRICES_TABLE, ColumnDefinition::integer("min_seats"))
            .await?;
        op.add_column(PRICES_TABLE, ColumnDefinition::integer("max_seats"))
            .await?;

        Ok(())
    }

    async fn downgrade(&self, op: &mut SchemaEditor<'_>) -> Result<(), SchemaError> {
        // Reverse order of upgrade.
        op.drop_column(PRICES_TABLE, "max_seats").await?;
        op.drop_column(PRICES_TABLE, "min_seats").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sqlx::{AnyPool, Row};

    use super::*;
    use crate::common::dialect::Dialect;
    use crate::migrate::migration_options::MigrationOptions;
    use crate::migrate::runner::MigrationRunner;
    use crate::revision::graph::RevisionGraph;
    use crate::revision::target::Target;
    use crate::test_helpers::{column_names, create_prices_table, memory_pool, table_columns};
    use crate::versions::migrations;

    const PREVIOUS: &str = "add_order_support_to_customer_seats";
    const CURRENT: &str = "add_min_max_seats_to_seat_pricing";

    fn runner(transaction_per_migration: bool) -> MigrationRunner {
        let graph = RevisionGraph::new(migrations()).unwrap();
        let mut options = MigrationOptions::new(Dialect::Sqlite);
        options.transaction_per_migration = transaction_per_migration;

        MigrationRunner::new(graph, options)
    }

    /// Database sitting at the predecessor revision, with one existing price row.
    async fn stamped_database(runner: &MigrationRunner) -> AnyPool {
        let pool = memory_pool().await;
        create_prices_table(&pool).await;

        sqlx::query("INSERT INTO product_prices (product_id, amount_type) VALUES (1, 'seat_based')")
            .execute(&pool)
            .await
            .unwrap();

        runner
            .stamp(&pool, &Target::Revision(PREVIOUS.to_string()))
            .await
            .unwrap();

        pool
    }

    async fn seat_bounds(pool: &AnyPool) -> Vec<(Option<i64>, Option<i64>)> {
        sqlx::query("SELECT min_seats, max_seats FROM product_prices ORDER BY id")
            .fetch_all(pool)
            .await
            .unwrap()
            .iter()
            .map(|row| {
                (
                    row.get::<Option<i64>, _>("min_seats"),
                    row.get::<Option<i64>, _>("max_seats"),
                )
            })
            .collect()
    }

    fn expect_schema_error(err: &anyhow::Error) -> &SchemaError {
        err.downcast_ref::<SchemaError>()
            .unwrap_or_else(|| panic!("not a schema error: {:?}", err))
    }

    #[test]
    fn identifies_itself_to_the_ledger() {
        let revision = AddMinMaxSeatsToSeatPricing.revision();

        assert_eq!(revision.id, CURRENT);
        assert_eq!(revision.down_revision, &[PREVIOUS]);
        assert!(revision.branch_labels.is_empty());
        assert!(revision.depends_on.is_empty());

        let graph = RevisionGraph::new(migrations()).unwrap();
        assert_eq!(graph.heads(), vec![CURRENT]);
        assert_eq!(graph.anchors(), vec![PREVIOUS]);
    }

    #[tokio::test]
    async fn upgrade_adds_nullable_integer_columns() {
        let runner = runner(true);
        let pool = stamped_database(&runner).await;

        let results = runner.upgrade(&pool, &Target::Head).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].revision, CURRENT);

        let columns = table_columns(&pool, "product_prices").await;
        assert_eq!(
            &columns[3..],
            &[
                ("min_seats".to_string(), "INTEGER".to_string(), false),
                ("max_seats".to_string(), "INTEGER".to_string(), false),
            ]
        );
        assert_eq!(runner.current(&pool).await.unwrap(), vec![CURRENT]);
    }

    #[tokio::test]
    async fn existing_rows_read_back_null_not_zero() {
        let runner = runner(true);
        let pool = stamped_database(&runner).await;

        runner.upgrade(&pool, &Target::Head).await.unwrap();

        assert_eq!(seat_bounds(&pool).await, vec![(None, None)]);
    }

    #[tokio::test]
    async fn new_rows_default_to_null_bounds() {
        let runner = runner(true);
        let pool = memory_pool().await;
        create_prices_table(&pool).await;
        runner
            .stamp(&pool, &Target::Revision(PREVIOUS.to_string()))
            .await
            .unwrap();

        runner.upgrade(&pool, &Target::Head).await.unwrap();

        sqlx::query("INSERT INTO product_prices (product_id, amount_type) VALUES (7, 'seat_based')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO product_prices (product_id, amount_type, min_seats, max_seats) VALUES (8, 'seat_based', 5, 50)",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(
            seat_bounds(&pool).await,
            vec![(None, None), (Some(5), Some(50))]
        );
    }

    #[tokio::test]
    async fn downgrade_restores_previous_schema() {
        let runner = runner(true);
        let pool = stamped_database(&runner).await;
        let before = table_columns(&pool, "product_prices").await;

        runner.upgrade(&pool, &Target::Head).await.unwrap();
        let results = runner.downgrade(&pool, &Target::Relative(-1)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(table_columns(&pool, "product_prices").await, before);
        assert_eq!(runner.current(&pool).await.unwrap(), vec![PREVIOUS]);
    }

    #[tokio::test]
    async fn downgrade_drops_max_before_min() {
        let mut statements = Vec::new();
        let mut editor = SchemaEditor::offline(&mut statements, Dialect::Postgres);

        AddMinMaxSeatsToSeatPricing
            .downgrade(&mut editor)
            .await
            .unwrap();

        assert_eq!(
            statements,
            vec![
                r#"ALTER TABLE "product_prices" DROP COLUMN "max_seats""#,
                r#"ALTER TABLE "product_prices" DROP COLUMN "min_seats""#,
            ]
        );
    }

    #[tokio::test]
    async fn upgrading_an_upgraded_schema_conflicts() {
        let pool = memory_pool().await;
        create_prices_table(&pool).await;

        let mut connection = pool.acquire().await.unwrap();
        let mut editor = SchemaEditor::online(&mut connection, Dialect::Sqlite);

        AddMinMaxSeatsToSeatPricing.upgrade(&mut editor).await.unwrap();
        let err = AddMinMaxSeatsToSeatPricing
            .upgrade(&mut editor)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(matches!(err, SchemaError::ColumnExists { ref column, .. } if column == "min_seats"));

        drop(connection);
        let names = column_names(&pool, "product_prices").await;
        assert_eq!(names.iter().filter(|name| *name == "min_seats").count(), 1);
    }

    #[tokio::test]
    async fn downgrade_without_columns_conflicts() {
        let runner = runner(true);
        let pool = memory_pool().await;
        create_prices_table(&pool).await;
        runner
            .stamp(&pool, &Target::Revision(CURRENT.to_string()))
            .await
            .unwrap();

        let err = runner
            .downgrade(&pool, &Target::Relative(-1))
            .await
            .unwrap_err();

        assert!(matches!(
            expect_schema_error(&err),
            SchemaError::ColumnMissing { column, .. } if column == "max_seats"
        ));
        assert_eq!(runner.current(&pool).await.unwrap(), vec![CURRENT]);
    }

    #[tokio::test]
    async fn failed_upgrade_rolls_back_partial_changes() {
        for transaction_per_migration in [true, false] {
            let runner = runner(transaction_per_migration);
            let pool = stamped_database(&runner).await;
            sqlx::query("ALTER TABLE product_prices ADD COLUMN max_seats INTEGER")
                .execute(&pool)
                .await
                .unwrap();
            let before = column_names(&pool, "product_prices").await;

            let err = runner.upgrade(&pool, &Target::Head).await.unwrap_err();

            assert!(expect_schema_error(&err).is_conflict());
            assert_eq!(column_names(&pool, "product_prices").await, before);
            assert_eq!(runner.current(&pool).await.unwrap(), vec![PREVIOUS]);
        }
    }

    #[tokio::test]
    async fn upgrade_requires_the_predecessor_to_be_applied() {
        let runner = runner(true);
        let pool = memory_pool().await;
        create_prices_table(&pool).await;

        let err = runner.upgrade(&pool, &Target::Head).await.unwrap_err();

        assert!(err.to_string().contains(PREVIOUS));
        assert!(!column_names(&pool, "product_prices")
            .await
            .contains(&"min_seats".to_string()));
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connectivity_error() {
        let runner = runner(true);
        let pool = stamped_database(&runner).await;
        pool.close().await;

        let err = runner.upgrade(&pool, &Target::Head).await.unwrap_err();

        assert!(matches!(
            expect_schema_error(&err),
            SchemaError::Connectivity(_)
        ));
    }

    #[tokio::test]
    async fn downgrade_on_unreachable_database_is_a_connectivity_error() {
        let runner = runner(true);
        let pool = stamped_database(&runner).await;
        runner.upgrade(&pool, &Target::Head).await.unwrap();
        pool.close().await;

        let err = runner
            .downgrade(&pool, &Target::Relative(-1))
            .await
            .unwrap_err();

        assert!(matches!(
            expect_schema_error(&err),
            SchemaError::Connectivity(_)
        ));
    }

    #[tokio::test]
    async fn renders_offline_upgrade_script() {
        let graph = RevisionGraph::new(migrations()).unwrap();
        let runner = MigrationRunner::new(graph, MigrationOptions::new(Dialect::Postgres));

        let script = runner.upgrade_sql(None, &Target::Head).await.unwrap();

        assert_eq!(
            script.lines().collect::<Vec<_>>(),
            vec![
                r#"CREATE TABLE IF NOT EXISTS "alembic_version" (version_num VARCHAR(128) NOT NULL, CONSTRAINT "alembic_version_pkc" PRIMARY KEY (version_num));"#,
                "BEGIN;",
                "-- Running upgrade add_order_support_to_customer_seats -> add_min_max_seats_to_seat_pricing",
                r#"ALTER TABLE "product_prices" ADD COLUMN "min_seats" INTEGER;"#,
                r#"ALTER TABLE "product_prices" ADD COLUMN "max_seats" INTEGER;"#,
                r#"UPDATE "alembic_version" SET version_num = 'add_min_max_seats_to_seat_pricing' WHERE version_num = 'add_order_support_to_customer_seats';"#,
                "COMMIT;",
            ]
        );
    }

    #[tokio::test]
    async fn renders_offline_downgrade_script() {
        let graph = RevisionGraph::new(migrations()).unwrap();
        let runner = MigrationRunner::new(graph, MigrationOptions::new(Dialect::MySql));

        let script = runner
            .downgrade_sql(&Target::Head, &Target::Base)
            .await
            .unwrap();

        assert!(script.contains(
            "-- Running downgrade add_min_max_seats_to_seat_pricing -> add_order_support_to_customer_seats"
        ));
        let max = script.find("DROP COLUMN `max_seats`").unwrap();
        let min = script.find("DROP COLUMN `min_seats`").unwrap();
        assert!(max < min);
    }
}
