use stockroom::{init_tracing, run, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(config.log_dir.as_deref())
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing: {error}"))?;
    run(config).await
}
