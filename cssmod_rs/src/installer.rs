//! Download, version-check, and atomic replacement of the linter binary.
//!
//! The installer is the only writer of the cache file. Feature code only
//! ever executes the binary, so install completion is the single ordering
//! point: callers finish [`Installer::ensure_installed`] before issuing
//! the first subprocess invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::ToolError;
use crate::platform::{self, Platform};

/// Hop budget for explicit redirect resolution.
const MAX_REDIRECT_HOPS: usize = 5;

/// The locally cached linter executable.
///
/// Invariant: when `path` exists on disk it is fully written and
/// executable. Downloads land in a same-directory temporary file and are
/// renamed into place, so no partial binary is ever visible here.
#[derive(Debug, Clone)]
pub struct ManagedTool {
    pub platform: Platform,
    pub path: PathBuf,
    pub version: String,
}

/// Knobs for [`Installer`]. Defaults target the public release endpoints
/// and the per-user cache directory.
#[derive(Debug, Clone)]
pub struct InstallerOptions {
    /// Use a pre-built binary at this path; skips download and version check.
    pub tool_path: Option<PathBuf>,
    /// Pin a release tag instead of asking the metadata endpoint.
    pub release_tag: Option<String>,
    /// Re-check the published version when a cached binary already exists.
    pub auto_update: bool,
    /// Override the cache directory (sandboxed setups, tests).
    pub cache_dir: Option<PathBuf>,
    /// Override the release download base URL.
    pub download_base: String,
    /// Override the release metadata endpoint.
    pub metadata_url: String,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            tool_path: None,
            release_tag: None,
            auto_update: true,
            cache_dir: None,
            download_base: platform::DOWNLOAD_BASE.to_string(),
            metadata_url: platform::RELEASE_METADATA_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    tag_name: String,
}

/// Installs and refreshes the cached linter binary.
pub struct Installer {
    client: reqwest::Client,
    options: InstallerOptions,
    /// Serializes concurrent install triggers so one cannot delete the
    /// binary out from under another's version probe.
    lock: Mutex<()>,
}

impl Installer {
    pub fn new(options: InstallerOptions) -> Result<Self, ToolError> {
        // Redirect hops are resolved by hand so each one is followed
        // deliberately; the release CDN answers with 302s.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("cssmod/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ToolError::Install(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            options,
            lock: Mutex::new(()),
        })
    }

    /// Ensures a runnable linter binary and reports its location and tag.
    ///
    /// Idempotent: a second call with no remote change performs no
    /// downloads. Not retried internally; the caller decides whether the
    /// next trigger tries again.
    pub async fn ensure_installed(&self) -> Result<ManagedTool, ToolError> {
        let _guard = self.lock.lock().await;

        if let Some(tool_path) = &self.options.tool_path {
            if !tool_path.exists() {
                return Err(ToolError::Install(format!(
                    "configured tool path does not exist: {}",
                    tool_path.display()
                )));
            }
            let version = self
                .installed_version(tool_path)
                .await
                .unwrap_or_else(|| "local".to_string());
            return Ok(ManagedTool {
                platform: Platform::current()?,
                path: tool_path.clone(),
                version,
            });
        }

        let platform = Platform::current()?;
        let cache_dir = match &self.options.cache_dir {
            Some(dir) => dir.clone(),
            None => platform::cache_dir()?,
        };
        let path = cache_dir.join(platform.binary_name());

        if !path.exists() {
            let tag = self.target_tag().await?;
            self.download(platform, &tag, &path).await?;
            return Ok(ManagedTool {
                platform,
                path,
                version: tag,
            });
        }

        if !self.options.auto_update {
            let version = self
                .installed_version(&path)
                .await
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(ManagedTool {
                platform,
                path,
                version,
            });
        }

        let latest = self.target_tag().await?;
        match self.installed_version(&path).await {
            // Exact string equality on the tag; no ordering semantics.
            Some(installed) if installed == latest => {
                tracing::debug!("css-linter {installed} is current");
                Ok(ManagedTool {
                    platform,
                    path,
                    version: installed,
                })
            }
            installed => {
                tracing::info!(?installed, latest = %latest, "refreshing css-linter binary");
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| ToolError::Install(format!("failed to remove stale binary: {e}")))?;
                self.download(platform, &latest, &path).await?;
                Ok(ManagedTool {
                    platform,
                    path,
                    version: latest,
                })
            }
        }
    }

    /// The binary's self-reported tag via `-v`, if it runs at all.
    async fn installed_version(&self, path: &Path) -> Option<String> {
        let output = tokio::process::Command::new(path)
            .arg("-v")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!version.is_empty()).then_some(version)
    }

    /// The tag to install: pinned, or whatever the metadata endpoint
    /// publishes as latest.
    async fn target_tag(&self) -> Result<String, ToolError> {
        if let Some(tag) = &self.options.release_tag {
            return Ok(tag.clone());
        }
        let response = self
            .get_following_redirects(&self.options.metadata_url)
            .await?;
        let metadata: ReleaseMetadata = response
            .json()
            .await
            .map_err(|e| ToolError::Install(format!("invalid release metadata: {e}")))?;
        Ok(metadata.tag_name)
    }

    /// Streams the release asset into a temporary file, marks it
    /// executable, and renames it into place.
    async fn download(&self, platform: Platform, tag: &str, dest: &Path) -> Result<(), ToolError> {
        let dir = dest
            .parent()
            .ok_or_else(|| ToolError::Install("cache path has no parent".into()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ToolError::Install(format!("failed to create cache dir: {e}")))?;

        let url = platform.asset_url(&self.options.download_base, tag);
        tracing::info!(%url, "downloading css-linter");
        let response = self.get_following_redirects(&url).await?;

        let tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| ToolError::Install(format!("failed to create temp file: {e}")))?;
        {
            use std::io::Write;
            let mut file = tmp.as_file();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk =
                    chunk.map_err(|e| ToolError::Install(format!("download interrupted: {e}")))?;
                file.write_all(&chunk)
                    .map_err(|e| ToolError::Install(format!("failed to write binary: {e}")))?;
            }
            file.flush()
                .map_err(|e| ToolError::Install(format!("failed to flush binary: {e}")))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o755))
                .map_err(|e| ToolError::Install(format!("failed to set permissions: {e}")))?;
        }

        tmp.persist(dest)
            .map_err(|e| ToolError::Install(format!("failed to move binary into place: {e}")))?;
        tracing::info!(path = %dest.display(), "css-linter installed");
        Ok(())
    }

    /// GET with explicit redirect handling: each hop is followed exactly
    /// once against its `Location` target, bounded by the hop budget.
    async fn get_following_redirects(&self, url: &str) -> Result<reqwest::Response, ToolError> {
        let mut url = url.to_string();
        for _ in 0..=MAX_REDIRECT_HOPS {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ToolError::Install(format!("request to {url} failed: {e}")))?;
            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        ToolError::Install(format!("redirect from {url} carried no location"))
                    })?;
                url = location.to_string();
                continue;
            }
            if !status.is_success() {
                return Err(ToolError::Install(format!("{url} answered {status}")));
            }
            return Ok(response);
        }
        Err(ToolError::Install(format!("too many redirects fetching {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_target_public_endpoints() {
        let options = InstallerOptions::default();
        assert!(options.tool_path.is_none());
        assert!(options.auto_update);
        assert_eq!(options.download_base, platform::DOWNLOAD_BASE);
        assert_eq!(options.metadata_url, platform::RELEASE_METADATA_URL);
    }

    #[tokio::test]
    async fn missing_configured_tool_path_is_an_install_error() {
        let options = InstallerOptions {
            tool_path: Some(PathBuf::from("/nonexistent/css-linter")),
            ..InstallerOptions::default()
        };
        let installer = Installer::new(options).expect("client");
        match installer.ensure_installed().await {
            Err(ToolError::Install(message)) => assert!(message.contains("does not exist")),
            other => panic!("expected install error, got {other:?}"),
        }
    }
}
