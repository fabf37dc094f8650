//! chatinput-server - TCP chat server demonstrating per-user input capture

use std::path::PathBuf;

use anyhow::Result;
use chatinput_server::{ChatServer, Config};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Line-oriented chat server with interactive prompts
#[derive(Parser, Debug)]
#[command(name = "chatinput-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.chatinput/config.toml)
    #[arg(short, long, env = "CHATINPUT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Strip color codes instead of rendering ANSI escapes
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("chatinput_server=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("chatinput-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if cli.no_color {
        config.server.ansi_colors = false;
    }

    let server = ChatServer::bind(&config).await?;
    info!(addr = %server.local_addr()?, "listening");

    server
        .serve_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
}
