//! End-to-end install flow against a loopback release server.
//!
//! Covers the redirect walk, the atomic temp-file landing, the
//! exact-string version no-op, and stale-binary replacement without
//! touching the network.

#![cfg(unix)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use cssmod::installer::{Installer, InstallerOptions};
use cssmod::platform::Platform;
use cssmod::ToolError;

#[derive(Clone)]
enum Reply {
    Json(&'static str),
    Redirect(String),
    Bytes(&'static [u8]),
    /// Declares more content than it sends, then closes the socket.
    Truncated {
        declared: usize,
        body: &'static [u8],
    },
}

struct StubServer {
    base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Serves the given path -> reply table on a loopback port until the
    /// test process exits.
    fn start(routes: impl FnOnce(&str) -> HashMap<String, Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let routes = routes(&base);
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&hits);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buffer = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buffer) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buffer[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                seen.lock().expect("hits lock").push(path.clone());

                let reply = routes.get(&path).cloned();
                let _ = match reply {
                    Some(Reply::Json(body)) => write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    ),
                    Some(Reply::Redirect(target)) => write!(
                        stream,
                        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        target
                    ),
                    Some(Reply::Bytes(body)) => {
                        let _ = write!(
                            stream,
                            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            body.len()
                        );
                        stream.write_all(body)
                    }
                    Some(Reply::Truncated { declared, body }) => {
                        let _ = write!(
                            stream,
                            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            declared
                        );
                        let _ = stream.write_all(body);
                        let _ = stream.flush();
                        // Drop the stream with bytes still owed.
                        Ok(())
                    }
                    None => write!(
                        stream,
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    ),
                };
            }
        });

        Self { base, hits }
    }

    fn count(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|hit| hit.as_str() == path)
            .count()
    }
}

fn options_for(server: &StubServer, cache: PathBuf) -> InstallerOptions {
    InstallerOptions {
        cache_dir: Some(cache),
        download_base: format!("{}/dl", server.base),
        metadata_url: format!("{}/meta", server.base),
        ..InstallerOptions::default()
    }
}

fn binary_path(cache: &std::path::Path) -> PathBuf {
    cache.join(Platform::current().expect("supported host").binary_name())
}

fn asset_route() -> String {
    format!(
        "/dl/v1.2/{}",
        Platform::current().expect("supported host").binary_name()
    )
}

/// A stand-in cached binary that reports the given tag on `-v`.
fn seed_fake_binary(cache: &std::path::Path, tag: &str) {
    std::fs::create_dir_all(cache).expect("cache dir");
    let path = binary_path(cache);
    std::fs::write(&path, format!("#!/bin/sh\nprintf '{tag}'\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make executable");
}

#[tokio::test]
async fn fresh_install_follows_redirects_and_lands_executable() {
    let server = StubServer::start(|base| {
        let mut routes = HashMap::new();
        routes.insert(
            "/meta".to_string(),
            Reply::Json(r#"{"tag_name": "v1.2"}"#),
        );
        routes.insert(asset_route(), Reply::Redirect(format!("{base}/hop")));
        routes.insert("/hop".to_string(), Reply::Redirect(format!("{base}/asset")));
        routes.insert("/asset".to_string(), Reply::Bytes(b"BINARY CONTENT"));
        routes
    });
    let cache = tempfile::tempdir().expect("tempdir");

    let installer = Installer::new(options_for(&server, cache.path().to_path_buf())).expect("client");
    let tool = installer.ensure_installed().await.expect("install");

    assert_eq!(tool.version, "v1.2");
    assert_eq!(tool.path, binary_path(cache.path()));
    assert_eq!(std::fs::read(&tool.path).expect("read binary"), b"BINARY CONTENT");
    let mode = std::fs::metadata(&tool.path).expect("metadata").permissions().mode();
    assert_ne!(mode & 0o111, 0, "binary must be executable");
    // Each redirect hop was taken exactly once.
    assert_eq!(server.count(&asset_route()), 1);
    assert_eq!(server.count("/hop"), 1);
    assert_eq!(server.count("/asset"), 1);
}

#[tokio::test]
async fn interrupted_download_leaves_no_file_at_the_final_path() {
    let server = StubServer::start(|_| {
        let mut routes = HashMap::new();
        routes.insert(
            "/meta".to_string(),
            Reply::Json(r#"{"tag_name": "v1.2"}"#),
        );
        routes.insert(
            asset_route(),
            Reply::Truncated {
                declared: 4096,
                body: b"short",
            },
        );
        routes
    });
    let cache = tempfile::tempdir().expect("tempdir");

    let installer = Installer::new(options_for(&server, cache.path().to_path_buf())).expect("client");
    match installer.ensure_installed().await {
        Err(ToolError::Install(_)) => {}
        other => panic!("expected install failure, got {other:?}"),
    }

    assert!(!binary_path(cache.path()).exists());
    // The temp file was cleaned up with the failed download.
    let leftovers: Vec<_> = std::fs::read_dir(cache.path())
        .expect("read cache dir")
        .collect();
    assert!(leftovers.is_empty(), "no partial files may survive: {leftovers:?}");
}

#[tokio::test]
async fn matching_version_performs_no_download() {
    let server = StubServer::start(|_| {
        let mut routes = HashMap::new();
        routes.insert(
            "/meta".to_string(),
            Reply::Json(r#"{"tag_name": "v1.2"}"#),
        );
        routes
    });
    let cache = tempfile::tempdir().expect("tempdir");
    seed_fake_binary(cache.path(), "v1.2");

    let installer = Installer::new(options_for(&server, cache.path().to_path_buf())).expect("client");
    let tool = installer.ensure_installed().await.expect("install");

    assert_eq!(tool.version, "v1.2");
    assert_eq!(server.count("/meta"), 1);
    assert_eq!(server.count(&asset_route()), 0);
}

#[tokio::test]
async fn stale_version_is_deleted_and_refetched() {
    let server = StubServer::start(|_| {
        let mut routes = HashMap::new();
        routes.insert(
            "/meta".to_string(),
            Reply::Json(r#"{"tag_name": "v1.2"}"#),
        );
        routes.insert(asset_route(), Reply::Bytes(b"FRESH BINARY"));
        routes
    });
    let cache = tempfile::tempdir().expect("tempdir");
    seed_fake_binary(cache.path(), "v1.0");

    let installer = Installer::new(options_for(&server, cache.path().to_path_buf())).expect("client");
    let tool = installer.ensure_installed().await.expect("install");

    assert_eq!(tool.version, "v1.2");
    assert_eq!(
        std::fs::read(binary_path(cache.path())).expect("read binary"),
        b"FRESH BINARY"
    );
    assert_eq!(server.count(&asset_route()), 1);
}

#[tokio::test]
async fn pinned_tag_skips_the_metadata_endpoint() {
    let platform = Platform::current().expect("supported host");
    let pinned_route = format!("/dl/v7.7/{}", platform.binary_name());
    let route = pinned_route.clone();
    let server = StubServer::start(move |_| {
        let mut routes = HashMap::new();
        routes.insert(route, Reply::Bytes(b"PINNED"));
        routes
    });
    let cache = tempfile::tempdir().expect("tempdir");

    let mut options = options_for(&server, cache.path().to_path_buf());
    options.release_tag = Some("v7.7".to_string());
    let installer = Installer::new(options).expect("client");
    let tool = installer.ensure_installed().await.expect("install");

    assert_eq!(tool.version, "v7.7");
    assert_eq!(server.count("/meta"), 0);
    assert_eq!(server.count(&pinned_route), 1);
}
