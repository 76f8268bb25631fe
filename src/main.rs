//! confsync server - main entry point.
//!
//! Scans the configuration directory, registers one configuration object per
//! application record, and serves ChangeConfiguration / GetConfiguration /
//! Subscribe over TCP until Ctrl-C.

use clap::Parser;
use confsync::bus::SignalBus;
use confsync::ipc::IpcServer;
use confsync::registry::NoopStore;
use confsync::types::ObservabilityConfig;
use confsync::{loader, Config, Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "confsync-server", version, about = "Configuration synchronization server")]
struct Args {
    /// JSON settings file
    #[arg(long, env = "CONFSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides settings file)
    #[arg(long, env = "CONFSYNC_LISTEN")]
    listen: Option<String>,

    /// Directory of per-application JSON records (overrides settings file)
    #[arg(long, env = "CONFSYNC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            confsync::observability::init_tracing(&ObservabilityConfig::default());
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    confsync::observability::init_tracing(&config.observability);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = &args.listen {
        config.server.listen_addr = listen.clone();
    }
    if let Some(dir) = &args.config_dir {
        config.server.config_dir = dir.clone();
    }
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = config.server.listen_addr.parse().map_err(|e| {
        Error::validation(format!("invalid listen address {:?}: {}", config.server.listen_addr, e))
    })?;

    let bus = Arc::new(SignalBus::new());
    let Some(registry) = loader::load_registry(&config.server, bus, Arc::new(NoopStore))? else {
        tracing::info!("Nothing to serve, exiting");
        return Ok(());
    };

    let server = IpcServer::new(Arc::new(registry), config.ipc.clone());
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            cancel.cancel();
        }
    });

    tracing::info!("confsync server running. Waiting for calls...");
    server
        .serve(addr)
        .await
        .map_err(|e| Error::transport(format!("server on {} failed: {}", addr, e)))
}
