//! Snapshot storage + HTTP fetch utilities for gamedex.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "gamedex-storage";

/// Serializes with four-space indentation, the layout the canonical store has always
/// been written with.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .context("serializing json snapshot")?;
    Ok(out)
}

/// Replace `path` with `bytes` through a sibling temp file and rename, so readers see
/// either the old or the new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).with_context(|| format!("creating directory {}", parent.display()))?;

    let temp_path = parent.join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .with_context(|| format!("opening temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    file.flush()
        .with_context(|| format!("flushing temp file {}", temp_path.display()))?;
    drop(file);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err).with_context(|| {
            format!(
                "atomically renaming {} -> {}",
                temp_path.display(),
                path.display()
            )
        });
    }
    Ok(())
}

/// Whole-collection JSON snapshot file: an ordered array, loaded and saved wholesale.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file as an empty array when it does not exist yet.
    pub fn ensure_exists(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        write_atomic(&self.path, b"[]")
    }

    pub fn load<T: DeserializeOwned>(&self) -> anyhow::Result<Vec<T>> {
        self.ensure_exists()?;
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    pub fn save<T: Serialize>(&self, items: &[T]) -> anyhow::Result<()> {
        let bytes = to_pretty_json(items)?;
        write_atomic(&self.path, &bytes)
    }
}

/// Exponential retry schedule for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub initial: Duration,
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial: Duration::from_millis(250),
            ceiling: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `retry` (zero-based), doubling up to the ceiling.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.ceiling)
    }
}

/// Throttling and server-side failures are worth another attempt.
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    /// URL after redirects.
    pub final_url: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to page failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    HttpStatus { status: u16, url: String },
}

/// Plain HTTP page fetcher. Requests are issued one at a time by the caller.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        let builder = match config.user_agent {
            Some(agent) => builder.user_agent(agent),
            None => builder,
        };

        Ok(Self {
            client: builder.build().context("building http client")?,
            retry: config.retry,
        })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let span = info_span!("http_fetch", url);
        self.fetch_with_retries(url).instrument(span).await
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut retry = 0;
        loop {
            let failure = match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();
                    let body = resp.text().await?;
                    return Ok(FetchedPage {
                        status,
                        final_url,
                        body,
                    });
                }
                Ok(resp) => {
                    let transient = is_transient_status(resp.status());
                    let failure = FetchError::HttpStatus {
                        status: resp.status().as_u16(),
                        url: resp.url().to_string(),
                    };
                    (transient, failure)
                }
                Err(err) => (is_transient_error(&err), FetchError::Request(err)),
            };

            match failure {
                (true, err) if retry < self.retry.retries => {
                    debug!(error = %err, retry, "page fetch failed, retrying");
                    tokio::time::sleep(self.retry.delay(retry)).await;
                    retry += 1;
                }
                (_, err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        title: String,
    }

    #[test]
    fn missing_store_is_created_as_empty_array() {
        let dir = tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path().join("nested").join("list.json"));
        let rows: Vec<Row> = store.load().expect("load");
        assert!(rows.is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn save_writes_four_space_indent_and_reloads() {
        let dir = tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path().join("list.json"));
        let rows = vec![Row { title: "A".into() }];
        store.save(&rows).expect("save");

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "[\n    {\n        \"title\": \"A\"\n    }\n]");
        let reloaded: Vec<Row> = store.load().expect("load");
        assert_eq!(reloaded, rows);
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("list.json");
        fs::write(&path, "{not json").unwrap();
        let err = JsonStore::new(&path).load::<Row>().unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn retry_delay_doubles_until_ceiling() {
        let policy = RetryPolicy {
            retries: 5,
            initial: Duration::from_millis(100),
            ceiling: Duration::from_millis(350),
        };
        let delays: Vec<_> = (0..4).map(|r| policy.delay(r).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 350, 350]);
        assert_eq!(policy.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn only_throttling_and_server_errors_are_transient() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
    }
}
