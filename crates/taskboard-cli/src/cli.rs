use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Taskboard - workspaces, sections and tasks over a JSON API", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start API server
    Serve {
        /// Port to listen on (overrides TASKBOARD_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (overrides TASKBOARD_HOST)
        #[arg(long)]
        host: Option<String>,
    },

    /// Initialize database
    InitDb,

    /// Write a workspace's activity feed to a CSV or JSON file
    ExportActivity {
        /// Workspace ID
        #[arg(long)]
        workspace: Uuid,

        /// csv or json
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output path; defaults to the generated file name
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Only these event kinds, comma-separated
        #[arg(long)]
        kind: Option<String>,

        /// Only events at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Only events before this RFC 3339 timestamp
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_args() {
        let cli = Cli::try_parse_from([
            "taskboard",
            "export-activity",
            "--workspace",
            "8f14e45f-ceea-467f-a0e6-5c1b5f1e0b2a",
            "--format",
            "json",
            "--kind",
            "task.created,task.moved",
        ])
        .unwrap();

        match cli.command {
            Commands::ExportActivity { format, kind, output, .. } => {
                assert_eq!(format, "json");
                assert_eq!(kind.as_deref(), Some("task.created,task.moved"));
                assert!(output.is_none());
            }
            _ => panic!("expected export-activity"),
        }
    }

    #[test]
    fn test_serve_overrides_are_optional() {
        let cli = Cli::try_parse_from(["taskboard", "serve", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080), host: None }));
    }

    #[test]
    fn test_bad_workspace_id_is_rejected() {
        assert!(Cli::try_parse_from(["taskboard", "export-activity", "--workspace", "nope"]).is_err());
    }
}
