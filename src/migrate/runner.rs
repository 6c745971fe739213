use anyhow::{anyhow, Context, Result};
use sqlx::{Any, AnyPool, Transaction};
use tokio::time::Instant;

use crate::common::errors::SchemaError;
use crate::edit::editor::SchemaEditor;
use crate::edit::query::render_script;
use crate::ledger::VersionLedger;
use crate::migrate::migration_options::MigrationOptions;
use crate::migrate::migration_result::MigrationResult;
use crate::revision::graph::RevisionGraph;
use crate::revision::plan::{Direction, PlannedStep};
use crate::revision::target::Target;

pub struct MigrationRunner {
    graph: RevisionGraph,
    ledger: VersionLedger,
    options: MigrationOptions,
}

impl MigrationRunner {
    pub fn new(graph: RevisionGraph, options: MigrationOptions) -> Self {
        let ledger = VersionLedger::new(&options.version_table, options.dialect);

        MigrationRunner {
            graph,
            ledger,
            options,
        }
    }

    pub fn graph(&self) -> &RevisionGraph {
        &self.graph
    }

    pub async fn current(&self, pool: &AnyPool) -> Result<Vec<String>> {
        let mut connection = pool
            .acquire()
            .await
            .map_err(|err| SchemaError::from_sqlx("ACQUIRE", err))?;
        let mut editor = SchemaEditor::online(&mut connection, self.options.dialect);

        let heads = self
            .ledger
            .heads(&mut editor)
            .await
            .context("Failed to read version ledger")?;

        Ok(heads)
    }

    pub async fn upgrade(&self, pool: &AnyPool, target: &Target) -> Result<Vec<MigrationResult>> {
        info!("Running upgrade to {}", target);

        let current = self.prepare(pool).await?;
        let plan = self.graph.upgrade_plan(&current, target)?;

        self.execute_plan(pool, plan).await
    }

    pub async fn downgrade(
        &self,
        pool: &AnyPool,
        target: &Target,
    ) -> Result<Vec<MigrationResult>> {
        info!("Running downgrade to {}", target);

        let current = self.prepare(pool).await?;
        let plan = self.graph.downgrade_plan(&current, target)?;

        self.execute_plan(pool, plan).await
    }

    /// Rewrites the ledger to `target` without running any revision.
    pub async fn stamp(&self, pool: &AnyPool, target: &Target) -> Result<Vec<String>> {
        let heads = self.graph.stamp_heads(target)?;

        let mut transaction = begin(pool).await?;
        let stamped = async {
            let mut editor = SchemaEditor::online(&mut transaction, self.options.dialect);
            self.ledger.ensure(&mut editor).await?;
            self.ledger.reset(&mut editor, &heads).await
        }
        .await;

        finish(transaction, stamped.context("Failed to stamp version ledger")).await?;

        info!("Stamped database with: {}", display_heads(&heads));

        Ok(heads.iter().map(|head| head.to_string()).collect())
    }

    /// Renders the upgrade from `from` (defaults to the known base) to `target` as SQL.
    pub async fn upgrade_sql(&self, from: Option<&Target>, target: &Target) -> Result<String> {
        let current = match from {
            Some(from) => self.graph.stamp_heads(from)?,
            None => self.graph.anchors(),
        };
        let current: Vec<String> = current.iter().map(|id| id.to_string()).collect();

        let plan = self.graph.upgrade_plan(&current, target)?;
        self.render_plan(&plan).await
    }

    pub async fn downgrade_sql(&self, from: &Target, target: &Target) -> Result<String> {
        let current: Vec<String> = self
            .graph
            .stamp_heads(from)?
            .iter()
            .map(|id| id.to_string())
            .collect();

        let plan = self.graph.downgrade_plan(&current, target)?;
        self.render_plan(&plan).await
    }

    async fn prepare(&self, pool: &AnyPool) -> Result<Vec<String>> {
        if !self.options.dialect.transactional_ddl() {
            warn!(
                "{} does not run DDL inside transactions, a failing revision may leave partial changes",
                self.options.dialect
            );
        }

        let mut connection = pool
            .acquire()
            .await
            .map_err(|err| SchemaError::from_sqlx("ACQUIRE", err))?;
        let mut editor = SchemaEditor::online(&mut connection, self.options.dialect);

        self.ledger
            .ensure(&mut editor)
            .await
            .with_context(|| format!("Failed to create table {}", self.ledger.table_name()))?;

        let heads = self
            .ledger
            .heads(&mut editor)
            .await
            .context("Failed to read version ledger")?;

        debug!("Current revision(s): {}", display_heads(&heads));

        Ok(heads)
    }

    async fn execute_plan(
        &self,
        pool: &AnyPool,
        plan: Vec<PlannedStep>,
    ) -> Result<Vec<MigrationResult>> {
        if plan.is_empty() {
            info!("Database is already at the requested revision");
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        let mut results = Vec::with_capacity(plan.len());

        if self.options.transaction_per_migration {
            for step in &plan {
                let mut transaction = begin(pool).await?;
                let result = self.run_step(&mut transaction, step).await;
                results.push(finish(transaction, result).await?);
            }
        } else {
            let mut transaction = begin(pool).await?;
            let mut outcome = Ok(());

            for step in &plan {
                match self.run_step(&mut transaction, step).await {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                }
            }

            finish(transaction, outcome).await?;
        }

        info!(
            "Migration finished, {} revision(s), total time took: {}s",
            results.len(),
            Instant::now()
                .saturating_duration_since(start_time)
                .as_secs_f32()
        );

        Ok(results)
    }

    async fn run_step(
        &self,
        transaction: &mut Transaction<'static, Any>,
        step: &PlannedStep,
    ) -> Result<MigrationResult> {
        let migration = self
            .graph
            .migration(step.revision)
            .ok_or_else(|| anyhow!("Revision {} is not loaded", step.revision))?;

        info!("{}", step);

        let start_time = Instant::now();
        let mut editor = SchemaEditor::online(transaction, self.options.dialect);

        match step.direction {
            Direction::Upgrade => migration.upgrade(&mut editor).await,
            Direction::Downgrade => migration.downgrade(&mut editor).await,
        }
        .with_context(|| format!("Failed to {} revision {}", step.direction, step.revision))?;

        self.ledger
            .replace(&mut editor, &step.removed_heads, &step.added_heads)
            .await
            .context("Failed to update version ledger")?;

        let elapsed = Instant::now().saturating_duration_since(start_time);

        debug!(
            "Revision {} finished, took: {}s",
            step.revision,
            elapsed.as_secs_f32()
        );

        Ok(MigrationResult {
            revision: step.revision.to_string(),
            direction: step.direction,
            elapsed,
        })
    }

    async fn render_plan(&self, plan: &[PlannedStep]) -> Result<String> {
        let mut statements = Vec::new();
        let mut editor = SchemaEditor::offline(&mut statements, self.options.dialect);

        self.ledger.ensure(&mut editor).await?;

        let per_migration = self.options.transaction_per_migration;
        if !per_migration && !plan.is_empty() {
            editor.execute("BEGIN").await?;
        }

        for step in plan {
            let migration = self
                .graph
                .migration(step.revision)
                .ok_or_else(|| anyhow!("Revision {} is not loaded", step.revision))?;

            if per_migration {
                editor.execute("BEGIN").await?;
            }

            editor.execute(&format!("-- {}", step)).await?;

            match step.direction {
                Direction::Upgrade => migration.upgrade(&mut editor).await?,
                Direction::Downgrade => migration.downgrade(&mut editor).await?,
            }

            self.ledger
                .replace(&mut editor, &step.removed_heads, &step.added_heads)
                .await?;

            if per_migration {
                editor.execute("COMMIT").await?;
            }
        }

        if !per_migration && !plan.is_empty() {
            editor.execute("COMMIT").await?;
        }

        Ok(render_script(&statements))
    }
}

async fn begin(pool: &AnyPool) -> Result<Transaction<'static, Any>, SchemaError> {
    pool.begin()
        .await
        .map_err(|err| SchemaError::from_sqlx("BEGIN", err))
}

/// Commits on success; otherwise rolls back and hands the original error back.
async fn finish<T>(transaction: Transaction<'static, Any>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            transaction
                .commit()
                .await
                .map_err(|err| SchemaError::from_sqlx("COMMIT", err))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

fn display_heads<S: AsRef<str>>(heads: &[S]) -> String {
    if heads.is_empty() {
        "<base>".to_string()
    } else {
        heads
            .iter()
            .map(|head| head.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
