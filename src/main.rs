#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;
use std::{env, fs, process, thread};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use env_logger::Env;
use sqlx::AnyPool;
use structopt::StructOpt;
use toml::Value;

use crate::args::{Args, Command};
use crate::common::helpers::{is_schema_conflict, print_error_chain};
use crate::config::Config;
use crate::connection::{DatabaseConnectionFactory, SqlxAnyConnection};
use crate::migrate::migration_options::MigrationOptions;
use crate::migrate::migration_result::MigrationResult;
use crate::migrate::runner::MigrationRunner;
use crate::revision::graph::RevisionGraph;
use crate::versions::migrations;

mod args;
mod common;
mod config;
mod connection;
mod edit;
mod ledger;
mod migrate;
mod revision;
#[cfg(test)]
mod test_helpers;
mod versions;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    if let Err(errors) = init().await.with_context(|| "Migration command failed") {
        print_error_chain(&errors);

        if is_schema_conflict(&errors) {
            warn!("The database schema does not match its recorded revision, check `current` or `stamp` it");
        }

        process::exit(1);
    }

    Ok(())
}

async fn init() -> Result<()> {
    let options = Args::from_args();

    initialize_logger(options.verbose, options.quiet);

    let graph = RevisionGraph::new(migrations()).context("Invalid revision history")?;

    if graph.is_empty() {
        warn!("No revisions are defined");
    } else {
        debug!("Total revisions loaded: {}", graph.len());
    }

    run_command(&options.command, graph, &options.config).await
}

async fn run_command(command: &Command, graph: RevisionGraph, config_path: &Path) -> Result<()> {
    match command {
        Command::Heads => print_heads(&graph),
        Command::History => print_history(&graph),
        Command::Upgrade {
            sql: true,
            from,
            target,
        } => {
            let runner = create_runner(graph, &load_config(config_path)?);
            let script = runner.upgrade_sql(from.as_ref(), target).await?;
            println!("{}", script);
        }
        Command::Downgrade {
            sql: true,
            from,
            target,
        } => {
            let from = from
                .as_ref()
                .ok_or_else(|| anyhow!("--from is required when rendering a downgrade"))?;
            let runner = create_runner(graph, &load_config(config_path)?);
            let script = runner.downgrade_sql(from, target).await?;
            println!("{}", script);
        }
        Command::Upgrade { target, .. } => {
            let (runner, pool) = connect(graph, config_path).await?;
            let results = runner.upgrade(&pool, target).await;
            pool.close().await;
            report_results(&results?);
        }
        Command::Downgrade { target, .. } => {
            let (runner, pool) = connect(graph, config_path).await?;
            let results = runner.downgrade(&pool, target).await;
            pool.close().await;
            report_results(&results?);
        }
        Command::Stamp { target } => {
            let (runner, pool) = connect(graph, config_path).await?;
            let stamped = runner.stamp(&pool, target).await;
            pool.close().await;
            stamped?;
        }
        Command::Current => {
            let (runner, pool) = connect(graph, config_path).await?;
            let heads = runner.current(&pool).await;
            pool.close().await;
            print_current(runner.graph(), &heads?);
        }
    }

    Ok(())
}

async fn connect(graph: RevisionGraph, config_path: &Path) -> Result<(MigrationRunner, AnyPool)> {
    let config = load_config(config_path)?;

    info!("Connecting to {} database...", config.database().dialect);

    let factory = DatabaseConnectionFactory::<SqlxAnyConnection>::new(config.database().clone());
    let connection = factory.create_connection().await?;

    Ok((create_runner(graph, &config), connection.pool))
}

fn create_runner(graph: RevisionGraph, config: &Config) -> MigrationRunner {
    let settings = config.settings();

    let mut options = MigrationOptions::new(config.database().dialect);
    options.version_table = settings.version_table.clone();
    options.transaction_per_migration = settings.transaction_per_migration;

    MigrationRunner::new(graph, options)
}

fn report_results(results: &[MigrationResult]) {
    for result in results {
        debug!(
            "{} {} took {}s",
            result.direction,
            result.revision,
            result.elapsed.as_secs_f32()
        );
    }
}

fn print_heads(graph: &RevisionGraph) {
    for head in graph.heads() {
        println!("{} (head)", head);
    }
}

fn print_history(graph: &RevisionGraph) {
    let heads = graph.heads();

    for revision in graph.history() {
        let marker = if heads.contains(&revision.id) {
            " (head)"
        } else {
            ""
        };

        println!("{}{}", revision, marker);
    }
}

fn print_current(graph: &RevisionGraph, current: &[String]) {
    if current.is_empty() {
        println!("<base>");
        return;
    }

    let heads = graph.heads();

    for revision in current {
        let marker = if heads.contains(&revision.as_str()) {
            " (head)"
        } else if graph.is_anchor(revision) {
            " (external)"
        } else {
            ""
        };

        println!("{}{}", revision, marker);
    }
}

fn initialize_logger(verbose: bool, quiet: bool) {
    // Set the `RUST_LOG` environment variable to control the logging level

    if quiet {
        env::set_var("RUST_LOG", "warn");
    } else {
        env::set_var("RUST_LOG", if verbose { "debug" } else { "info" });
    }

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sqlx", log::LevelFilter::Error)
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{} {:<5} [{}] - {}",
                timestamp,
                record.level(),
                thread::current().name().unwrap_or("<unnamed>"),
                record.args()
            )
        })
        .init();
}

fn load_config(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file {}", config_file.display()))?;
    let value = content.parse::<Value>()?;
    let config = Config::from_toml(value)?;
    Ok(config)
}
