mod commands;
mod logging;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clickdag_store::ConfigCollection;

use crate::output::Format;

#[derive(Parser)]
#[command(
    name = "clickdag",
    version,
    about = "Generates clickstream ETL pipeline definitions from stored workflow configs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Args)]
struct SettingsArgs {
    /// Settings YAML file (default: read settings from the environment)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct SourceArgs {
    /// Collection to read workflows from (clickstream, workflows, webhooks, ftp)
    #[arg(long, default_value = "clickstream")]
    source: ConfigCollection,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one pipeline definition per stored workflow
    Generate {
        #[command(flatten)]
        settings: SettingsArgs,
        #[command(flatten)]
        source: SourceArgs,
        /// Directory to write `<workflow id>.<format>` files into (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Also emit the framework connection exports
        #[arg(long)]
        emit_connections: bool,
    },
    /// Validate settings and config store connectivity
    Check {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Skip the config store connection
        #[arg(long)]
        offline: bool,
    },
    /// List stored workflows with their pipeline names and table split
    List {
        #[command(flatten)]
        settings: SettingsArgs,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show every stored activity as a table-copy payload
    Activities {
        #[command(flatten)]
        settings: SettingsArgs,
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Generate {
            settings,
            source,
            output,
            format,
            emit_connections,
        } => {
            commands::generate::execute(
                settings.config.as_deref(),
                source.source,
                output.as_deref(),
                format,
                emit_connections,
            )
            .await
        }
        Commands::Check { settings, offline } => {
            commands::check::execute(settings.config.as_deref(), offline).await
        }
        Commands::List { settings, source } => {
            commands::list::execute(settings.config.as_deref(), source.source).await
        }
        Commands::Activities { settings, source } => {
            commands::activities::execute(settings.config.as_deref(), source.source).await
        }
    }
}
