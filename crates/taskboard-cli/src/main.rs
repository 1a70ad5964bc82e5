use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use taskboard_api::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    let settings = Settings::load()?;
    taskboard_api::init_tracing(settings.log_format);

    commands::execute(cli, settings).await
}
