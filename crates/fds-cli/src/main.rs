//! fds - command-line client for FDS object storage

mod commands;

use clap::Parser;
use commands::Command;
use fds_client::{Config, FdsClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fds")]
#[command(about = "Command-line client for FDS object storage")]
#[command(version)]
struct Args {
    /// Service endpoint, e.g. https://cnbj0.fds.api.xiaomi.com
    #[arg(long, global = true, env = "FDS_BASE_URL")]
    endpoint: Option<String>,

    /// Access key id
    #[arg(long, global = true, env = "FDS_APP_KEY")]
    access_key: Option<String>,

    /// Secret access key
    #[arg(long, global = true, env = "FDS_APP_SECRET", hide_env_values = true)]
    secret_key: Option<String>,

    /// Maximum retries for connection failures
    #[arg(long, global = true, default_value = "3")]
    max_retries: u32,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "FDS_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn client(&self) -> anyhow::Result<FdsClient> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--endpoint (or FDS_BASE_URL) is required"))?;
        let access_key = self
            .access_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--access-key (or FDS_APP_KEY) is required"))?;
        let secret_key = self
            .secret_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--secret-key (or FDS_APP_SECRET) is required"))?;

        let config = Config::new(endpoint)
            .with_credentials(access_key, secret_key)
            .with_max_retries(self.max_retries);
        Ok(FdsClient::new(config)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so command output stays pipeable
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fds_client={0},fds_cli={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Command::StringToSign(ref sts) = args.command {
        println!("{}", sts.render()?);
        return Ok(());
    }

    let client = args.client()?;
    tracing::debug!("Using endpoint {}", client.config().endpoint);
    commands::run(&client, args.command).await
}
