use anyhow::Result;

use taskboard_api::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    taskboard_api::init_tracing(settings.log_format);

    taskboard_api::serve(settings).await
}
