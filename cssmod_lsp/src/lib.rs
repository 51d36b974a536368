//! cssmod Language Server Protocol implementation
//!
//! Bridges editors to the external css-linter binary: workspace lint
//! diagnostics, CSS-module navigation, completion, hover, references, and
//! the inline-style extraction command.

use clap::Parser;
use tower_lsp::{LspService, Server};

mod actions;
mod backend;
mod completion;
mod diagnostics;
mod hover;
mod navigation;
mod references;
mod settings;

pub use backend::Backend;
pub use settings::ServerSettings;

/// Command-line flags. Each mirrors an initialization option and wins over
/// it when both are given.
#[derive(Debug, Default, Clone, Parser)]
#[command(name = "cssmod-lsp", about = "LSP server for the css-linter tool")]
pub struct ServerArgs {
    /// Use a pre-built linter binary instead of the managed download.
    #[arg(long)]
    pub tool_path: Option<std::path::PathBuf>,

    /// Watchdog timeout for one linter invocation, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Skip the published-version check when a cached binary exists.
    #[arg(long)]
    pub no_auto_update: bool,
}

/// Run the LSP server over stdio
pub async fn run_server(args: ServerArgs) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| Backend::new(client, args));
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
