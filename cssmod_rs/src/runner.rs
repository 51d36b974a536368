//! Subprocess invocation for the managed linter binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ToolError;
use crate::protocol::{self, ClassRecord, ImportsMap, LintRecord, UsageRecord};

/// Default watchdog window for one linter invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runs the cached linter binary in its fixed argument modes.
///
/// Invocations are independent and may overlap freely; the only shared
/// state is the read-only binary path. Every call is bounded by the
/// watchdog so a wedged tool fails the one request instead of hanging the
/// editor.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    binary: PathBuf,
    workspace_root: PathBuf,
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(binary: PathBuf, workspace_root: PathBuf, timeout: Duration) -> Self {
        Self {
            binary,
            workspace_root,
            timeout,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// One invocation, returning stdout.
    ///
    /// Any stderr output fails the call even on a zero exit status: the
    /// linter reports usage errors that way without always exiting non-zero.
    pub async fn run(&self, args: &[&str]) -> Result<String, ToolError> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ToolError::Timeout(self.timeout.as_secs())),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            return Err(ToolError::Execution {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `--lint <root> --minify`: every finding across the workspace.
    pub async fn lint(&self) -> Result<Vec<LintRecord>, ToolError> {
        let root = self.workspace_root.to_string_lossy().into_owned();
        let stdout = self.run(&["--lint", &root, "--minify"]).await?;
        Ok(protocol::parse_lint(&stdout))
    }

    /// `--imports <file>`: identifier -> stylesheet bindings for one document.
    pub async fn imports(&self, file: &Path) -> Result<ImportsMap, ToolError> {
        let file = file.to_string_lossy().into_owned();
        let stdout = self.run(&["--imports", &file]).await?;
        ImportsMap::parse(&stdout)
    }

    /// `--classes <stylesheet>`: declared classes with positions.
    pub async fn classes(&self, stylesheet: &Path) -> Result<Vec<ClassRecord>, ToolError> {
        let stylesheet = stylesheet.to_string_lossy().into_owned();
        let stdout = self.run(&["--classes", &stylesheet]).await?;
        Ok(protocol::parse_classes(&stdout))
    }

    /// `--class <stylesheet> <name>`: raw rule text for hover rendering.
    pub async fn class_body(&self, stylesheet: &Path, name: &str) -> Result<String, ToolError> {
        let stylesheet = stylesheet.to_string_lossy().into_owned();
        self.run(&["--class", &stylesheet, name]).await
    }

    /// `--usages <file> <name>`: occurrences across the workspace.
    pub async fn usages(&self, file: &Path, name: &str) -> Result<Vec<UsageRecord>, ToolError> {
        let file = file.to_string_lossy().into_owned();
        let stdout = self.run(&["--usages", &file, name]).await?;
        Ok(protocol::parse_usages(&stdout))
    }

    /// `-v`: the binary's self-reported release tag.
    pub async fn version(&self) -> Result<String, ToolError> {
        Ok(self.run(&["-v"]).await?.trim().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn fake_tool(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("fake-linter");
        let mut file = std::fs::File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\n{script}").expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make executable");
        path
    }

    fn runner_for(script: &str, dir: &Path, timeout: Duration) -> ToolRunner {
        ToolRunner::new(fake_tool(dir, script), dir.to_path_buf(), timeout)
    }

    #[tokio::test]
    async fn run_captures_stdout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = runner_for("printf 'hello'", dir.path(), Duration::from_secs(5));
        assert_eq!(runner.run(&[]).await.expect("success"), "hello");
    }

    #[tokio::test]
    async fn stderr_fails_even_on_zero_exit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = runner_for(
            "printf 'partial output'; printf 'warning' >&2; exit 0",
            dir.path(),
            Duration::from_secs(5),
        );
        match runner.run(&[]).await {
            Err(ToolError::Execution { code, stderr }) => {
                assert_eq!(code, 0);
                assert_eq!(stderr, "warning");
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = runner_for("exit 3", dir.path(), Duration::from_secs(5));
        match runner.run(&[]).await {
            Err(ToolError::Execution { code, .. }) => assert_eq!(code, 3),
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn watchdog_bounds_a_wedged_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = runner_for("sleep 30", dir.path(), Duration::from_millis(200));
        match runner.run(&[]).await {
            Err(ToolError::Timeout(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_trims_the_tag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = runner_for("printf 'v1.2\\n'", dir.path(), Duration::from_secs(5));
        assert_eq!(runner.version().await.expect("version"), "v1.2");
    }
}
