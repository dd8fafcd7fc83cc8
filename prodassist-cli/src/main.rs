//! prodassist CLI: product question answering from the terminal.
//!
//! Runs the tool server (`serve`), single questions through the retrieval
//! graph (`ask`) or the linear pipeline (`pipeline`), raw routed lookups
//! (`lookup`), and an interactive session (`chat`).

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// prodassist: answers product questions from your catalog and the web
#[derive(Parser, Debug)]
#[command(name = "prodassist", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds .prodassist/config.toml)
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Skip answer scoring
    #[arg(long, global = true)]
    no_eval: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve get_product_info and web_search over stdio
    Serve {
        /// Product catalog (JSON array); overrides retrieval.catalog_path
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Answer one question with the retrieval graph
    Ask {
        /// The question
        query: String,
        /// Conversation thread to continue
        #[arg(short, long)]
        thread: Option<String>,
    },
    /// Answer one question with the linear pipeline over the local catalog
    Pipeline {
        /// The question
        query: String,
    },
    /// Route a query through the catalog and web fallback and print the raw result
    Lookup {
        /// The query
        query: String,
    },
    /// Interactive question answering within one thread
    Chat {
        /// Conversation thread to continue
        #[arg(short, long)]
        thread: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config file into the workspace
    Init,
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // stdout carries the protocol in serve mode, so humans read stderr.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = prodassist_core::config::data_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "prodassist.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .or_else(|_| std::env::current_dir())
        .unwrap_or_else(|_| PathBuf::from("."));

    let options = commands::Options {
        workspace,
        model: cli.model,
        evaluate: !cli.no_eval,
        quiet: cli.quiet,
    };
    commands::handle_command(cli.command, &options).await
}
