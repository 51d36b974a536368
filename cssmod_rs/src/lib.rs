//! # cssmod
//!
//! Integration core for the external `css-linter` tool: everything an
//! editor front end needs short of the editor itself.
//!
//! - [`installer`] — locates, downloads, version-checks, and atomically
//!   replaces the native linter binary in the per-user cache.
//! - [`runner`] — invokes the cached binary with its fixed argument modes
//!   and captures stdout, with a watchdog so a wedged tool cannot hang the
//!   editor.
//! - [`protocol`] — pure parsers for the tool's line-oriented,
//!   colon-delimited stdout grammars.
//! - [`convert`] — the inline-style extraction engine
//!   (`style={{ ... }}` literals to CSS rule blocks).
//!
//! The crate knows nothing about LSP; `cssmod-lsp` maps these records into
//! editor artifacts.

pub mod convert;
pub mod error;
pub mod installer;
pub mod platform;
pub mod protocol;
pub mod runner;

pub use error::ToolError;
pub use installer::{Installer, InstallerOptions, ManagedTool};
pub use runner::ToolRunner;
