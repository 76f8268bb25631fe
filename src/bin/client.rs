//! confsync client - prints its configured phrase every interval and picks
//! up changes broadcast by the server.

use clap::Parser;
use confsync::client::{self, ClientCache, ClientSettings, Worker, DEFAULT_APP};
use confsync::ipc::IpcClient;
use confsync::types::{default_config_dir, AppId, ObjectPath, ObservabilityConfig, DEFAULT_OBJECT_PATH_PREFIX};
use confsync::{Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "confsync-client", version, about = "Configuration synchronization client")]
struct Args {
    /// Server address
    #[arg(long, env = "CONFSYNC_SERVER", default_value = "127.0.0.1:50051")]
    server: String,

    /// Application name; its settings are read from <config-dir>/<app>.json
    #[arg(long, default_value = DEFAULT_APP)]
    app: String,

    /// Directory holding the application's JSON record
    #[arg(long, env = "CONFSYNC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Object path prefix used by the server
    #[arg(long, default_value = DEFAULT_OBJECT_PATH_PREFIX)]
    prefix: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    confsync::observability::init_tracing(&ObservabilityConfig::default());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_dir = args.config_dir.unwrap_or_else(default_config_dir);
    let settings = ClientSettings::load(&config_dir.join(format!("{}.json", args.app)))?;
    tracing::info!(
        "Loaded settings: interval {}ms, phrase {:?}",
        settings.interval_ms,
        settings.phrase
    );

    let app_id = AppId::derive(&args.app).map_err(Error::validation)?;
    let path = ObjectPath::for_app(&args.prefix, &app_id).map_err(Error::validation)?;

    let stream = IpcClient::connect(args.server.as_str())
        .await?
        .subscribe(path.as_str())
        .await?;

    let cache = Arc::new(ClientCache::new(settings));
    tokio::select! {
        result = client::listen(stream, cache.clone()) => result,
        () = Worker::new(cache, std::io::stdout()).run() => Ok(()),
    }
}
