//! Error taxonomy for the css-linter integration.

use thiserror::Error;

/// Failures of the managed tool, from installation through invocation.
///
/// `UnsupportedPlatform` and `Install` block the whole integration until
/// resolved; the remaining variants are contained to the invocation that
/// produced them.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The host platform has no published linter binary.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Network or filesystem failure while fetching or replacing the binary.
    #[error("failed to install css-linter: {0}")]
    Install(String),

    /// Failed to spawn the linter process.
    #[error("failed to spawn css-linter: {0}")]
    Spawn(#[from] std::io::Error),

    /// The linter exited non-zero or wrote to its error stream.
    #[error("css-linter exited with code {code}: {stderr}")]
    Execution { code: i32, stderr: String },

    /// The linter did not exit within the watchdog window.
    #[error("css-linter timed out after {0}s")]
    Timeout(u64),

    /// The imports output was not a JSON object of strings.
    #[error("invalid imports map: {0}")]
    ImportsMap(String),
}
