use anyhow::Result;
use clap::Parser;
use deep_research::cli::Args;
use deep_research::launch;

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, input) = args.into_parts()?;
    init_tracing(config.verbose)?;

    let response = launch(&config, &input).await?;
    if let Some(error) = response.error {
        anyhow::bail!("deep research failed: {}", error);
    }
    Ok(())
}
