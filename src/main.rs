use clap::Parser;
use tracing_subscriber::EnvFilter;

use support_desk::config::Config;
use support_desk::daemon;
use support_desk::error::Result;

#[derive(Parser, Debug)]
#[command(name = "support-desk")]
#[command(about = "AI customer-support chat backend")]
struct Cli {
    #[arg(long, default_value = "./support-desk.json", env = "SUPPORT_DESK_CONFIG")]
    config: String,

    #[arg(long, help = "Override the configured bind host")]
    host: Option<String>,

    #[arg(long, help = "Override the configured bind port")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_file(&cli.config)
        .unwrap_or_default()
        .resolve_env();
    if cli.host.is_some() {
        config.server.host = cli.host;
    }
    if cli.port.is_some() {
        config.server.port = cli.port;
    }

    daemon::run(config).await
}
