//! Reconciliation of the game catalog against its source sites.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gamedex_adapters::{default_resolver, Resolver};
use gamedex_storage::{HttpClientConfig, HttpFetcher, JsonStore};

pub mod catalog;
pub mod patch;
pub mod reconcile;
pub mod taxonomy;

pub use catalog::{BatchSummary, Catalog};
pub use patch::{PatchApplier, PatchOutcome};
pub use reconcile::{ReconcileError, Reconciler};
pub use taxonomy::{Derivation, Taxonomy};

pub const CRATE_NAME: &str = "gamedex-sync";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_dir: PathBuf,
    pub catalog_file: PathBuf,
    pub taxonomy_file: PathBuf,
    pub patch_file: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("GAMEDEX_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let file = |var: &str, default: &str| {
            lookup(var)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(default))
        };

        Self {
            catalog_file: file("GAMEDEX_CATALOG_FILE", "gamelist.json"),
            taxonomy_file: file("GAMEDEX_TAXONOMY_FILE", "tag_translation.json"),
            patch_file: file("GAMEDEX_PATCH_FILE", "patches.json"),
            user_agent: lookup("GAMEDEX_USER_AGENT").unwrap_or_else(|| "gamedex/0.1".to_string()),
            http_timeout_secs: lookup("GAMEDEX_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            data_dir,
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
            ..HttpClientConfig::default()
        }
    }
}

/// Built-in sites backed by a live HTTP fetcher.
pub fn build_resolver(config: &SyncConfig) -> Result<Resolver> {
    let fetcher = HttpFetcher::new(config.http_client_config())?;
    Ok(default_resolver(Arc::new(fetcher)))
}

/// Catalog wired to the configured files and the built-in sites. Nothing is read
/// until [`Catalog::load`].
pub fn catalog_from_config(config: &SyncConfig) -> Result<Catalog> {
    let resolver = build_resolver(config)?;
    let reconciler = Reconciler::new(Taxonomy::load(&config.taxonomy_file));
    Ok(Catalog::new(JsonStore::new(&config.catalog_file), resolver, reconciler)
        .with_patch_file(&config.patch_file))
}
