//! Switchboard Signal Server
//!
//! HTTP polling signaling relay for WebRTC peers.
//!
//! # Usage
//!
//! ```bash
//! # Public mode on port 80 (default)
//! switchboard-signal
//!
//! # Private mode: two sessions per connection id
//! switchboard-signal --port 8080 --mode private
//!
//! # Explicit config file, JSON logs
//! switchboard-signal --config /etc/switchboard/config.toml --log-format json
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use switchboard_core::{Config, SignalingMode};
use switchboard_signal::SignalServer;

#[derive(Parser, Debug)]
#[command(name = "switchboard-signal")]
#[command(about = "HTTP polling signaling relay for WebRTC peers")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "SWITCHBOARD_PORT")]
    port: Option<u16>,

    /// Bind address (overrides the config file)
    #[arg(short, long, env = "SWITCHBOARD_BIND")]
    bind: Option<IpAddr>,

    /// Pairing mode (overrides the config file)
    #[arg(short, long, value_enum, env = "SWITCHBOARD_MODE")]
    mode: Option<ModeArg>,

    /// Config file path (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Public,
    Private,
}

impl From<ModeArg> for SignalingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Public => SignalingMode::Public,
            ModeArg::Private => SignalingMode::Private,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(port) = args.port {
        config.signal.port = port;
    }
    if let Some(bind) = args.bind {
        config.signal.bind = bind;
    }
    if let Some(mode) = args.mode {
        config.signal.mode = mode.into();
    }

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let addr = config.signal.socket_addr();

    info!("Starting Switchboard Signal Server");
    info!("Mode: {}", config.signal.mode);
    info!("Using in-memory storage (no persistence)");

    let server = SignalServer::new(config.signal.mode);
    server.serve(addr).await?;

    info!("Signal server stopped");
    Ok(())
}
