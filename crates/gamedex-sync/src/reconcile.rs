//! Merging freshly observed fields into canonical records.

use gamedex_adapters::{AdapterError, Resolver};
use gamedex_core::{FieldError, FieldMap, MergePolicy, Record};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::taxonomy::Taxonomy;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("adapter {adapter} failed for {url}: {source}")]
    Adapter {
        adapter: String,
        url: String,
        #[source]
        source: AdapterError,
    },
    #[error("persisting taxonomy: {0:#}")]
    Taxonomy(anyhow::Error),
}

/// Applies the overwrite policy, maintains the version ledger and grows curated tags
/// through the owned [`Taxonomy`].
#[derive(Debug)]
pub struct Reconciler {
    taxonomy: Taxonomy,
}

impl Reconciler {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn taxonomy_mut(&mut self) -> &mut Taxonomy {
        &mut self.taxonomy
    }

    /// Merges `raw` into `record`. With `overwrite == false` only empty fields are
    /// filled. Curated tags and the version ledger only ever grow. On error the
    /// record keeps its previous contents.
    pub fn merge<'r>(
        &mut self,
        record: &'r mut Record,
        raw: &FieldMap,
        overwrite: bool,
    ) -> Result<&'r mut Record, ReconcileError> {
        let mut staged = record.clone();
        staged.apply_fields(raw, MergePolicy::from_overwrite(overwrite))?;

        if !staged.published.is_empty() && staged.updated.is_empty() {
            staged.updated = staged.published.clone();
        }

        if !staged.last_version.is_empty() && !staged.updated.is_empty() {
            let (label, date) = (staged.last_version.clone(), staged.updated.clone());
            if staged.versions.record(&label, &date) {
                debug!(id = %staged.id, version = %label, first_seen = %date, "new version recorded");
            }
        }

        staged.normalize_tags();

        let derived = self.taxonomy.derive(&staged.tags, &staged.my_tags);
        staged.union_my_tags(derived.curated);
        if derived.dirty {
            self.taxonomy.flush().map_err(ReconcileError::Taxonomy)?;
        }

        *record = staged;
        Ok(record)
    }

    /// Raw fields currently published for the record, or `None` when no adapter
    /// applies or the adapter found nothing.
    pub async fn fetch_current(
        &self,
        record: &Record,
        resolver: &Resolver,
        adapter_name: Option<&str>,
    ) -> Result<Option<FieldMap>, ReconcileError> {
        let Some(adapter) = resolver.resolve(&record.url, adapter_name) else {
            info!(url = %record.url, "no adapter found");
            return Ok(None);
        };

        let data = adapter
            .fetch_and_extract(&record.url)
            .await
            .map_err(|source| ReconcileError::Adapter {
                adapter: adapter.descriptor().name.to_string(),
                url: record.url.clone(),
                source,
            })?;

        match data {
            Some(fields) if !fields.is_empty() => Ok(Some(fields)),
            _ => {
                info!(title = %record.title, url = %record.url, "no data retrieved");
                Ok(None)
            }
        }
    }

    /// Fresh fields when the source reports an `updated` value different from the
    /// stored one. The comparison is literal; a non-string value always differs.
    pub async fn check_for_update(
        &self,
        record: &Record,
        resolver: &Resolver,
    ) -> Result<Option<FieldMap>, ReconcileError> {
        if !record.url_is_valid {
            return Ok(None);
        }

        let Some(data) = self.fetch_current(record, resolver, None).await? else {
            return Ok(None);
        };

        let remote = data.get("updated").cloned().unwrap_or(Value::Null);
        let differs = match &remote {
            value if is_falsy(value) => false,
            Value::String(remote) => *remote != record.updated,
            _ => true,
        };

        if differs {
            info!(
                title = %record.title,
                url = %record.url,
                remote = %remote,
                stored = %record.updated,
                "update available"
            );
            Ok(Some(data))
        } else {
            Ok(None)
        }
    }

    /// Refreshes a record from `prefetched` fields or, when absent, from its adapter.
    /// Returns the merged fields, or `None` when the URL is marked invalid or nothing
    /// could be fetched.
    pub async fn update(
        &mut self,
        record: &mut Record,
        resolver: &Resolver,
        overwrite: bool,
        prefetched: Option<FieldMap>,
    ) -> Result<Option<FieldMap>, ReconcileError> {
        if !record.url_is_valid {
            info!(title = %record.title, "url marked invalid, skipping update");
            return Ok(None);
        }

        let data = match prefetched {
            Some(data) => data,
            None => match self.fetch_current(record, resolver, None).await? {
                Some(data) => data,
                None => return Ok(None),
            },
        };

        self.merge(record, &data, overwrite)?;
        Ok(Some(data))
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}
