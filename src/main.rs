#![forbid(unsafe_code)]

//! `notebook-chat`: run chat-notebook cells from the command line.
//!
//! Loads a JSON notebook, runs the requested cells with the configured
//! runner, and writes the updated notebook back in place.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use notebook_chat::config::GlobalConfig;
use notebook_chat::conversation::{expand_conversation, extract_conversation};
use notebook_chat::document::notebook_file::{load_notebook, save_notebook};
use notebook_chat::document::DocumentService;
use notebook_chat::notify::TracingNotifier;
use notebook_chat::orchestrator::NotebookController;
use notebook_chat::runner::build_runner;
use notebook_chat::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "notebook-chat", about = "Chat notebook cell runner", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one or more cells and save the notebook.
    Run {
        /// Notebook JSON file.
        #[arg(long)]
        notebook: PathBuf,
        /// Cell index to run; repeat to run several in order.
        #[arg(long = "cell", required = true)]
        cells: Vec<usize>,
    },
    /// Print the expanded conversation a cell would send, without editing.
    Messages {
        /// Notebook JSON file.
        #[arg(long)]
        notebook: PathBuf,
        /// Index of the triggering cell.
        #[arg(long)]
        cell: usize,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = match args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };

    match args.command {
        Command::Run { notebook, cells } => run_cells(config, notebook, &cells).await,
        Command::Messages { notebook, cell } => print_messages(&config, &notebook, cell).await,
    }
}

async fn run_cells(config: GlobalConfig, notebook: PathBuf, cells: &[usize]) -> Result<()> {
    let document = Arc::new(load_notebook(&notebook)?);
    let runner = build_runner(&config.runner)?;
    let controller = Arc::new(NotebookController::new(
        Arc::clone(&document) as Arc<dyn DocumentService>,
        runner,
        Arc::new(TracingNotifier),
        config,
    ));
    info!(notebook = %notebook.display(), cells = cells.len(), "running cells");

    let interrupter = Arc::clone(&controller);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        info!("interrupt signal received");
        interrupter.interrupt();
    });

    let outcomes = controller.execute_cells(cells).await;
    signal_task.abort();

    save_notebook(document.as_ref(), &notebook)?;

    let mut failures = 0usize;
    for (requested, outcome) in cells.iter().zip(&outcomes) {
        let response = outcome
            .response_index
            .map_or_else(|| "-".to_owned(), |index| index.to_string());
        if outcome.success {
            println!("cell {requested}: ok (response cell {response})");
        } else {
            failures += 1;
            let reason = outcome.error.as_deref().unwrap_or("unknown error");
            println!("cell {requested}: failed: {reason}");
        }
    }

    if failures == 0 {
        Ok(())
    } else {
        error!(failures, "one or more cells failed");
        Err(AppError::Runner(format!("{failures} cell(s) failed")))
    }
}

async fn print_messages(
    config: &GlobalConfig,
    notebook: &std::path::Path,
    cell: usize,
) -> Result<()> {
    let document = load_notebook(notebook)?;
    let cells = document.cells();
    if cell >= cells.len() {
        return Err(AppError::NotFound(format!("cell {cell} does not exist")));
    }

    let base_dir = config.resolve_base_dir(document.base_dir());
    let messages = extract_conversation(&cells, cell);
    let messages = expand_conversation(messages, &base_dir, &TracingNotifier).await;

    println!("{}", serde_json::to_string_pretty(&messages)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
