//! Platform table and release endpoints for the managed binary.
//!
//! The platform -> asset-name mapping lives here and nowhere else; every
//! other module receives it through [`Platform`].

use std::path::PathBuf;

use crate::error::ToolError;

/// Release asset download base, `<base>/<tag>/<asset>`.
pub const DOWNLOAD_BASE: &str =
    "https://github.com/Andcool-Systems/css-linter/releases/download";

/// Latest-release metadata endpoint; answers JSON with a `tag_name` field.
pub const RELEASE_METADATA_URL: &str =
    "https://api.github.com/repos/Andcool-Systems/css-linter/releases/latest";

/// Platforms the linter publishes release binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// The host platform, or a fatal configuration error for anything the
    /// linter does not ship binaries for.
    pub fn current() -> Result<Self, ToolError> {
        match std::env::consts::OS {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Macos),
            "windows" => Ok(Self::Windows),
            other => Err(ToolError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Release asset name, doubling as the cached executable's file name.
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::Linux => "css-linter-linux",
            Self::Macos => "css-linter-macos",
            Self::Windows => "css-linter-win.exe",
        }
    }

    /// Download URL of this platform's asset for a release tag.
    pub fn asset_url(self, base: &str, tag: &str) -> String {
        format!("{}/{}/{}", base.trim_end_matches('/'), tag, self.binary_name())
    }
}

/// Per-user cache directory holding exactly one executable per platform.
pub fn cache_dir() -> Result<PathBuf, ToolError> {
    dirs::home_dir()
        .map(|home| home.join(".css-linter"))
        .ok_or_else(|| ToolError::Install("could not determine home directory".into()))
}
