//! CLI argument definitions for the medchat binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use medchat_core::types::BackendSelection;

/// Retrieval-augmented medical question answering.
#[derive(Parser, Debug)]
#[command(name = "medchat", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the canned question documents.
    #[arg(short = 'd', long = "docs-dir", global = true)]
    pub docs_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        /// llama2 | bedrock_titan | bedrock_claude | bedrock_claudev2
        backend: BackendSelection,

        /// API server port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Chat interactively in the terminal.
    Chat {
        /// llama2 | bedrock_titan | bedrock_claude | bedrock_claudev2
        backend: BackendSelection,
    },
}

impl CliArgs {
    pub fn backend(&self) -> BackendSelection {
        match self.command {
            Command::Serve { backend, .. } | Command::Chat { backend } => backend,
        }
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MEDCHAT_CONFIG env var > ./medchat.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup("MEDCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("medchat.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > MEDCHAT_PORT env var > config file value > 3030.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.resolve_port_with(config_port, |key| std::env::var(key).ok())
    }

    fn resolve_port_with<F>(&self, config_port: u16, lookup: F) -> u16
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Command::Serve { port: Some(p), .. } = self.command {
            return p;
        }
        if let Some(p) = lookup("MEDCHAT_PORT").and_then(|v| v.parse::<u16>().ok()) {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        3030
    }

    /// Resolve the docs directory: --docs-dir flag > config file value.
    pub fn resolve_docs_dir(&self, config_docs_dir: &str) -> PathBuf {
        self.docs_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_docs_dir))
    }

    /// Resolve the log level: --log-level flag > config file value.
    ///
    /// RUST_LOG, when set, is honored before either.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}
