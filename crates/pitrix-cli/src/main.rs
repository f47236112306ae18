//! Pitrix jobs CLI
//!
//! Maintenance jobs for the application store. `import` loads a directory of
//! chart bundles into the store.

mod commands;

use clap::{Parser, Subcommand};
use commands::ImportCommand;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "PITRIX_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "PITRIX_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import chart bundles into the application store
    Import(ImportCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.clone();

    // RUST_LOG wins when set; otherwise pitrix crates log at the requested
    // level and noisy dependencies at warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("Invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "pitrix_cli={level},\
             pitrix_import={level},\
             pitrix_import_types={level},\
             pitrix_chart={level},\
             pitrix_store={level},\
             pitrix_blob={level},\
             h2=warn,\
             hyper=warn,\
             reqwest=warn,\
             rustls=warn,\
             aws_config=warn,\
             aws_sdk_s3=warn,\
             aws_smithy_runtime=warn",
            level = log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    match cli.command {
        Commands::Import(import_cmd) => import_cmd.execute(),
    }
}
