//! Server configuration from CLI flags and client initialization options.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use cssmod::installer::InstallerOptions;
use cssmod::runner::DEFAULT_TIMEOUT_SECS;

use crate::ServerArgs;

/// Initialization options sent by the client; every field optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitOptions {
    tool_path: Option<PathBuf>,
    release_tag: Option<String>,
    timeout_secs: Option<u64>,
    auto_update: Option<bool>,
}

/// Effective settings after folding client options under CLI flags.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub tool_path: Option<PathBuf>,
    pub release_tag: Option<String>,
    pub timeout_secs: u64,
    pub auto_update: bool,
}

impl ServerSettings {
    /// Merge CLI flags over `initializationOptions`. Malformed options are
    /// logged and ignored rather than failing the handshake.
    pub fn resolve(args: &ServerArgs, init_options: Option<serde_json::Value>) -> Self {
        let options: InitOptions = match init_options {
            Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed initializationOptions: {e}");
                InitOptions::default()
            }),
            None => InitOptions::default(),
        };

        Self {
            tool_path: args.tool_path.clone().or(options.tool_path),
            release_tag: options.release_tag,
            timeout_secs: args
                .timeout_secs
                .or(options.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            auto_update: if args.no_auto_update {
                false
            } else {
                options.auto_update.unwrap_or(true)
            },
        }
    }

    pub fn installer_options(&self) -> InstallerOptions {
        InstallerOptions {
            tool_path: self.tool_path.clone(),
            release_tag: self.release_tag.clone(),
            auto_update: self.auto_update,
            ..InstallerOptions::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
