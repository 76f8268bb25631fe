use clap::{Parser, Subcommand};
use confsync::ipc::IpcClient;
use confsync::types::{AppId, ObjectPath, ObservabilityConfig, DEFAULT_OBJECT_PATH_PREFIX};
use confsync::{Error, Result, Value};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "confsync-ctl")]
#[command(about = "Read and change configuration held by a confsync server", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONFSYNC_SERVER", default_value = "127.0.0.1:50051")]
    server: String,

    #[arg(long, default_value = DEFAULT_OBJECT_PATH_PREFIX)]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an application's full configuration
    Get { app: String },
    /// Change one existing key
    Set {
        app: String,
        key: String,
        value: String,
        /// Send the value as a string even if it looks numeric
        #[arg(long)]
        string: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    confsync::observability::init_tracing(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..ObservabilityConfig::default()
    });

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut client = IpcClient::connect(cli.server.as_str()).await?;

    match cli.command {
        Commands::Get { app } => {
            let path = object_path(&cli.prefix, &app)?;
            let record = client.get_configuration(path.as_str()).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Set {
            app,
            key,
            value,
            string,
        } => {
            let path = object_path(&cli.prefix, &app)?;
            let value = parse_value(&value, string);
            client.change_configuration(path.as_str(), &key, &value).await?;
            println!("{} {} = {}", path, key, value);
        }
    }
    Ok(())
}

fn object_path(prefix: &str, app: &str) -> Result<ObjectPath> {
    let app_id = AppId::derive(app).map_err(Error::validation)?;
    ObjectPath::for_app(prefix, &app_id).map_err(Error::validation)
}

/// Integer if it parses as one, then float, otherwise string.
fn parse_value(raw: &str, force_string: bool) -> Value {
    if force_string {
        return Value::from(raw);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::from(raw),
    }
}
