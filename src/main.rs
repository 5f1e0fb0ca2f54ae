use ragrelay::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development before reading config
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_target(false)
        .json()
        .init();

    ragrelay::start_server(config).await?;

    Ok(())
}
