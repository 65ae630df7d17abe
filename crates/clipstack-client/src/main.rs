mod daemon;
mod input_handler;
mod popup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clipstack_common::preview::truncate;
use clipstack_common::{socket_path, ClipstackError};
use clipstack_config::Config;
use clipstack_platform::{NoopInjector, PasteInjector, XdotoolInjector};
use clipstack_store::{History, HistoryStore, SyncPoller};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use daemon::{Daemon, CLIPBOARD_LINGER};
use input_handler::InputHandler;
use popup::Outcome;

#[derive(Parser)]
#[command(name = "clipstack", about = "Clipboard history manager")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the history picker (default)
    Popup,

    /// Print the history, most recent first
    #[command(alias = "ls")]
    List,

    /// Add text to the history
    Add {
        /// Text to record
        text: String,
    },

    /// Remove every entry
    Clear,

    /// Copy an entry to the clipboard
    Select {
        /// Position in the list (1 = most recent)
        index: usize,
    },

    /// Remove a single entry
    #[command(alias = "rm")]
    Remove {
        /// Position in the list (1 = most recent)
        index: usize,
    },

    /// Start the clipboard monitor in the background
    #[command(name = "start-server")]
    StartServer,

    /// Stop the clipboard monitor
    #[command(name = "kill-server")]
    KillServer,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}", e);
        Config::default_config()
    });
    let options = &config.options;
    let store = HistoryStore::new(options.history_file(), options.max_history);
    let daemon = Daemon::new(socket_path(), store.clone());

    match cli.command.unwrap_or(Commands::Popup) {
        Commands::Popup => {
            let poller = SyncPoller::new(store, options.refresh_interval());
            let input = InputHandler::new(config.key_table);
            let outcome =
                popup::run_popup(&daemon, &poller, &input, options.truncate_length).await?;
            debug!("Popup closed: {:?}", outcome);

            if let Outcome::Picked { text, hold } = outcome {
                debug!("Pasting {} bytes", text.len());
                let injector: Box<dyn PasteInjector> = if options.auto_paste {
                    Box::new(XdotoolInjector::new(options.paste_delay()))
                } else {
                    Box::new(NoopInjector)
                };
                injector.inject();
                hold.release(CLIPBOARD_LINGER).await;
            }
        }

        Commands::List => {
            let history = daemon.list();
            if history.is_empty() {
                println!("No clipboard history yet.");
            }
            for (i, entry) in history.iter().enumerate() {
                println!("{:>2}. {}", i + 1, truncate(entry, options.truncate_length));
            }
        }

        Commands::Add { text } => {
            if text.trim().is_empty() {
                anyhow::bail!("Refusing to add blank text");
            }
            daemon.add(&text).await?;
        }

        Commands::Clear => {
            daemon.clear().await?;
            info!("History cleared");
        }

        Commands::Select { index } => {
            let history = daemon.list();
            let text = entry_at(&history, index)?;
            daemon.select(text).await?.release(CLIPBOARD_LINGER).await;
        }

        Commands::Remove { index } => {
            let history = daemon.list();
            let text = entry_at(&history, index)?;
            daemon.remove(text).await?;
        }

        Commands::StartServer => {
            daemon.start_server().await?;
            println!("Server is running.");
        }

        Commands::KillServer => {
            if daemon.shutdown().await? {
                println!("Server stopped.");
            } else {
                println!("No server running on {}.", daemon.socket().display());
            }
        }
    }

    Ok(())
}

/// Look up a 1-based position from the command line.
fn entry_at(history: &History, index: usize) -> Result<&str> {
    index
        .checked_sub(1)
        .and_then(|i| history.get(i))
        .ok_or_else(|| anyhow::Error::from(ClipstackError::NoSuchEntry(index)))
}
