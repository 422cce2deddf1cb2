//! medchat binary - composition root.
//!
//! 1. Parse the command line
//! 2. Load configuration from TOML, overlay the environment, validate it
//! 3. Load the canned question corpus
//! 4. Wire the selected backend into a chat service
//! 5. Serve the HTTP API or run the terminal chat loop

mod cli;
mod repl;

use std::sync::Arc;

use clap::Parser;

use medchat_api::{start_server, AppState};
use medchat_chat::{ChatService, ConfiguredBackend};
use medchat_core::config::{MedchatConfig, RetrievalProvider};
use medchat_core::Corpus;

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let backend = args.backend();

    // Config. A present but unreadable file is fatal.
    let config_file = args.resolve_config_path();
    let loaded = MedchatConfig::load_if_present(&config_file)?;
    let config_found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_env();

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    tracing::info!("Starting medchat v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
    }

    if let Err(e) = config.validate(backend) {
        tracing::error!(backend = %backend, error = %e, "Invalid configuration");
        return Err(e.into());
    }

    // Corpus. Only the local retriever cannot run without it.
    let docs_dir = args.resolve_docs_dir(&config.general.docs_dir);
    let corpus = match Corpus::load(&docs_dir) {
        Ok(c) => c,
        Err(e) if config.retrieval.provider == RetrievalProvider::Local => {
            tracing::error!(dir = %docs_dir.display(), error = %e, "Corpus required by the local retriever");
            return Err(e.into());
        }
        Err(e) => {
            tracing::warn!(dir = %docs_dir.display(), error = %e, "No canned questions available");
            Corpus::default()
        }
    };
    let corpus = Arc::new(corpus);

    let adapter = ConfiguredBackend::from_config(backend, &config, Arc::clone(&corpus))?;
    let chat = ChatService::new(Arc::new(adapter), corpus, config.chat.clone());

    match &args.command {
        Command::Serve { .. } => {
            let port = args.resolve_port(config.general.port);
            start_server(AppState::new(chat, port)).await?;
        }
        Command::Chat { .. } => {
            repl::run(chat).await?;
        }
    }

    Ok(())
}
