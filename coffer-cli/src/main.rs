use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;
mod settings;

use commands::SyncOptions;
use output::OutputFormat;
use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(about = "Coffer CLI - list, fetch and watch objects across storage backends")]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.coffer/storage.toml)
    #[arg(long = "config", global = true, env = "CONFIG")]
    config_path: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Log level or filter directive (overrides settings and RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Work with stored objects
    #[command(subcommand)]
    Objects(ObjectCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print all settings or one dotted property
    Get {
        /// Property path, e.g. storage.bucket
        property: Option<String>,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum ObjectCommands {
    /// List objects directly under a prefix
    List {
        #[arg(default_value = "")]
        prefix: String,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Fetch one object
    Get {
        path: String,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,

        /// Write the object data to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Store an object from a file or stdin
    Put {
        path: String,

        /// Read data from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete one object
    Delete { path: String },

    /// Synchronize objects between two locations
    Sync {
        source: PathBuf,
        destination: PathBuf,

        #[arg(short, long)]
        recursive: bool,

        #[arg(long)]
        exclude: Vec<String>,

        #[arg(long)]
        include: Vec<String>,
    },

    /// Poll a prefix and log added, removed and updated objects
    Watch {
        #[arg(default_value = "")]
        prefix: String,

        /// Seconds between listings
        #[arg(long, default_value = "10")]
        interval: u64,

        /// Modification times closer than this (milliseconds) are not updates
        #[arg(long, default_value = "1000")]
        tolerance: u64,
    },
}

fn init_tracing(settings: &Settings, cli: &Cli) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| settings.log.level.clone());
    let json = cli.log_json || settings.log.json;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn run(cli: Cli, mut settings: Settings, settings_path: PathBuf) -> Result<()> {
    let objects = match cli.command {
        Commands::Config(ConfigCommands::Get { property, output }) => {
            return commands::config::run_get(&settings, property.as_deref(), output);
        }
        Commands::Objects(ObjectCommands::Sync {
            source,
            destination,
            recursive,
            exclude,
            include,
        }) => {
            let options = SyncOptions {
                source,
                destination,
                recursive,
                exclude,
                include,
            };
            return commands::objects::run_sync(&options).await;
        }
        Commands::Objects(objects) => objects,
    };

    let derived_namespace = settings.derive_etcd_namespace();
    let storage = coffer_storage::create_backend(&settings.storage, &settings.app).await?;
    tracing::debug!("Using {} storage", storage.backend_name());
    if let Some(namespace) = derived_namespace {
        Settings::persist_etcd_namespace(&settings_path, &namespace)?;
    }

    let storage = storage.as_ref();
    let mut stdout = std::io::stdout();
    match objects {
        ObjectCommands::List { prefix, output } => {
            commands::objects::run_list(storage, &prefix, output, &mut stdout).await
        }
        ObjectCommands::Get { path, output, out } => {
            commands::objects::run_get(storage, &path, output, out.as_deref(), &mut stdout).await
        }
        ObjectCommands::Put { path, file } => {
            commands::objects::run_put(storage, &path, file.as_deref()).await
        }
        ObjectCommands::Delete { path } => commands::objects::run_delete(storage, &path).await,
        ObjectCommands::Watch {
            prefix,
            interval,
            tolerance,
        } => {
            commands::objects::run_watch(
                storage,
                &prefix,
                Duration::from_secs(interval.max(1)),
                Duration::from_millis(tolerance),
            )
            .await
        }
        ObjectCommands::Sync { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .config_path
        .clone()
        .unwrap_or_else(settings::default_settings_path);
    let settings = Settings::load(&settings_path)?;
    init_tracing(&settings, &cli);

    tokio::select! {
        result = run(cli, settings, settings_path) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "coffer",
            "objects",
            "watch",
            "charts",
            "--interval",
            "5",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        match cli.command {
            Commands::Objects(ObjectCommands::Watch {
                prefix,
                interval,
                tolerance,
            }) => {
                assert_eq!(prefix, "charts");
                assert_eq!(interval, 5);
                assert_eq!(tolerance, 1000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sync_patterns() {
        let cli = Cli::try_parse_from([
            "coffer", "objects", "sync", "a", "b", "-r", "--exclude", "*.tmp", "--exclude",
            "*.bak",
        ])
        .unwrap();
        match cli.command {
            Commands::Objects(ObjectCommands::Sync {
                recursive, exclude, ..
            }) => {
                assert!(recursive);
                assert_eq!(exclude, vec!["*.tmp", "*.bak"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_get_json() {
        let cli =
            Cli::try_parse_from(["coffer", "config", "get", "storage.type", "-o", "json"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Get { property, output }) => {
                assert_eq!(property.as_deref(), Some("storage.type"));
                assert_eq!(output, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
