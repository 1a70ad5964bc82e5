use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::cli::{Cli, Commands};
use taskboard_api::config::Settings;
use taskboard_core::{board, ActivityQuery, EventKind, ExportFormat, Store, StoreStats};
use taskboard_db::Database;

pub async fn execute(cli: Cli, mut settings: Settings) -> Result<()> {
    if cli.database_url.is_some() {
        settings.database_url = cli.database_url;
    }

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(host) = host {
                settings.host = host;
            }

            if settings.database_url.is_none() {
                println!("Warning: No database configured. Data won't be persisted.");
            }

            taskboard_api::serve(settings).await?;
        }

        Commands::InitDb => {
            let database = connect(&settings).await?;
            println!("Initializing database schema...");
            database.init_schema().await?;
            println!("✓ Database initialized successfully");
        }

        Commands::ExportActivity {
            workspace,
            format,
            output,
            kind,
            since,
            until,
            limit,
        } => {
            let database = connect(&settings).await?;
            let format: ExportFormat = format.parse()?;

            if Store::get_workspace(&database, workspace).await?.is_none() {
                bail!("Workspace {} not found", workspace);
            }

            let query = ActivityQuery {
                kinds: parse_kinds(kind.as_deref())?,
                since,
                until,
                limit,
                ..Default::default()
            };

            let events = Store::list_events(&database, workspace).await?;
            let (body, file_name) =
                board::export_events(events, workspace, &query, format, settings.max_export_rows)?;

            let path = output.unwrap_or_else(|| PathBuf::from(file_name));
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("✓ Activity exported to {}", path.display());
        }

        Commands::Stats { json } => {
            let database = connect(&settings).await?;
            let stats = database.get_aggregate_stats().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> Result<Database> {
    let Some(ref db_url) = settings.database_url else {
        bail!("No database URL provided. Set DATABASE_URL environment variable.");
    };
    let database = Database::with_max_connections(db_url, settings.db_max_connections).await?;
    Ok(database)
}

fn parse_kinds(list: Option<&str>) -> Result<Vec<EventKind>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let kinds = list
        .split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(str::parse::<EventKind>)
        .collect::<taskboard_core::Result<Vec<_>>>()?;
    Ok(kinds)
}

fn print_stats(stats: &StoreStats) {
    println!("Taskboard Statistics\n");
    println!("  Users: {}", stats.users);
    println!("  Workspaces: {}", stats.workspaces);
    println!("  Sections: {}", stats.sections);
    println!("  Tasks: {}", stats.tasks);
    println!("  Completed: {}", stats.completed_tasks);
    println!("  Events: {}", stats.events);
}
