//! iPerfer network measurement tool.
//!
//! ```text
//! iperfer -s -p <port>
//! iperfer -c -h <host> -p <port> -t <seconds>
//! ```

use clap::Parser;
use netlab_iperfer::{client, server, Mode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "iperfer",
    about = "iPerfer network measurement tool",
    disable_help_flag = true
)]
struct Cli {
    /// Run as server.
    #[arg(short = 's', long)]
    server: bool,

    /// Run as client.
    #[arg(short = 'c', long)]
    client: bool,

    /// Server host (client mode).
    #[arg(short = 'h', long)]
    host: Option<String>,

    /// Port number.
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    port: Option<i64>,

    /// Seconds to send for (client mode).
    #[arg(short = 't', long)]
    time: Option<f64>,

    /// Print usage.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let mode = match Mode::from_args(cli.server, cli.client, cli.host, cli.port, cli.time) {
        Ok(mode) => mode,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    match mode {
        Mode::Server { port } => {
            tracing::info!("iPerfer server started on port {}", port);
            server::run(port).await?;
        }
        Mode::Client { host, port, time } => {
            tracing::info!("iPerfer client started on port {}", port);
            client::run((host.as_str(), port), time).await?;
        }
    }
    Ok(())
}
