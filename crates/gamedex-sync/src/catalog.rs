//! Record collection, batch refresh passes and persistence.

use std::path::PathBuf;

use gamedex_adapters::Resolver;
use gamedex_core::{FieldError, FieldMap, MergePolicy, Record, RecordId};
use gamedex_storage::JsonStore;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::patch::PatchApplier;
use crate::reconcile::{ReconcileError, Reconciler};

/// Outcome counts of an [`Catalog::update_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub visited: usize,
    pub reconciled: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Catalog {
    records: Vec<Record>,
    store: JsonStore,
    patch_file: Option<PathBuf>,
    resolver: Resolver,
    reconciler: Reconciler,
}

fn title_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Catalog {
    pub fn new(store: JsonStore, resolver: Resolver, reconciler: Reconciler) -> Self {
        Self {
            records: Vec::new(),
            store,
            patch_file: None,
            resolver,
            reconciler,
        }
    }

    pub fn with_patch_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.patch_file = Some(path.into());
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    /// Whether some stored title contains `title`, ignoring case.
    pub fn has(&self, title: &str) -> bool {
        self.records.iter().any(|r| title_contains(&r.title, title))
    }

    /// Appends `record` unless a stored title contains its title or is contained by
    /// it, ignoring case. This is a loose duplicate signal, not an identity check.
    pub fn add(&mut self, record: Record) -> bool {
        let duplicate = self
            .records
            .iter()
            .any(|r| title_contains(&r.title, &record.title) || title_contains(&record.title, &r.title));
        if duplicate {
            info!(title = %record.title, developer = %record.developer, "already in catalog");
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn find_by_id(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.url == url)
    }

    /// First record whose title contains `title` (ignoring case) and whose fields
    /// equal every entry of `criteria`. A criterion naming a missing field never
    /// matches.
    pub fn find_by_title(&self, title: &str, criteria: Option<&FieldMap>) -> Option<&Record> {
        self.position_by_title(title, criteria).map(|idx| &self.records[idx])
    }

    fn position_by_title(&self, title: &str, criteria: Option<&FieldMap>) -> Option<usize> {
        self.records.iter().position(|record| {
            title_contains(&record.title, title)
                && criteria.map_or(true, |criteria| {
                    criteria
                        .iter()
                        .all(|(key, expected)| record.field_value(key).as_ref() == Some(expected))
                })
        })
    }

    /// Merges `record` into the stored record with a matching title, developer and
    /// source (keeping the stored identifier), or appends it.
    pub fn update_or_create(&mut self, record: Record) -> Result<&Record, FieldError> {
        let mut criteria = FieldMap::new();
        criteria.insert("developer".into(), record.developer.clone().into());
        criteria.insert("source".into(), record.source.clone().into());

        match self.position_by_title(&record.title, Some(&criteria)) {
            Some(idx) => {
                self.records[idx].apply_fields(&record.to_field_map(), MergePolicy::Overwrite)?;
                Ok(&self.records[idx])
            }
            None => {
                info!(title = %record.title, developer = %record.developer, "not found, adding");
                self.records.push(record);
                Ok(&self.records[self.records.len() - 1])
            }
        }
    }

    /// Creates a record for `url`, refreshes it and stores it. Given `properties`
    /// seed the record and win over fetched values.
    pub async fn add_from_url(
        &mut self,
        url: &str,
        properties: Option<FieldMap>,
        adapter_name: Option<&str>,
    ) -> Result<Record, ReconcileError> {
        let mut record = Record::from_url(url);
        let overwrite = properties.as_ref().map_or(true, |p| p.is_empty());
        if let Some(properties) = &properties {
            record.apply_fields(properties, MergePolicy::Overwrite)?;
        }

        let fetched = self
            .reconciler
            .fetch_current(&record, &self.resolver, adapter_name)
            .await?;
        if let Some(data) = fetched {
            self.reconciler
                .update(&mut record, &self.resolver, overwrite, Some(data))
                .await?;
        }

        let stored = self.update_or_create(record)?.clone();
        Ok(stored)
    }

    /// Checks every record, in order, for a changed `updated` value. Only records
    /// reconciled in this pass are returned, so without `immediate_update` the
    /// result is always empty. A failing record is logged and skipped.
    pub async fn check_all_for_updates(&mut self, immediate_update: bool) -> Vec<Record> {
        let mut updates = Vec::new();
        for idx in 0..self.records.len() {
            let span = info_span!(
                "check_record",
                id = %self.records[idx].id,
                title = %self.records[idx].title
            );
            match self.check_one(idx, immediate_update).instrument(span).await {
                Ok(Some(record)) => updates.push(record),
                Ok(None) => {}
                Err(err) => warn!(
                    id = %self.records[idx].id,
                    title = %self.records[idx].title,
                    error = %err,
                    "update check failed"
                ),
            }
        }
        info!(checked = self.records.len(), updated = updates.len(), "update check finished");
        updates
    }

    async fn check_one(&mut self, idx: usize, immediate_update: bool) -> Result<Option<Record>, ReconcileError> {
        let Some(data) = self
            .reconciler
            .check_for_update(&self.records[idx], &self.resolver)
            .await?
        else {
            return Ok(None);
        };
        if !immediate_update {
            return Ok(None);
        }

        info!(developer = %self.records[idx].developer, "updating");
        self.reconciler
            .update(&mut self.records[idx], &self.resolver, true, Some(data))
            .await?;
        let snapshot = self.records[idx].clone();
        self.update_or_create(snapshot.clone())?;
        Ok(Some(snapshot))
    }

    /// Refetches and reconciles every record regardless of its `updated` value.
    pub async fn update_all(&mut self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for idx in 0..self.records.len() {
            summary.visited += 1;
            let span = info_span!(
                "update_record",
                id = %self.records[idx].id,
                title = %self.records[idx].title
            );
            let result = self
                .reconciler
                .update(&mut self.records[idx], &self.resolver, true, None)
                .instrument(span)
                .await;
            match result {
                Ok(Some(_)) => summary.reconciled += 1,
                Ok(None) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        id = %self.records[idx].id,
                        title = %self.records[idx].title,
                        error = %err,
                        "update failed"
                    );
                }
            }
        }
        info!(?summary, "update pass finished");
        summary
    }

    /// Restores the collection from the store, then applies the patch file. Only an
    /// unreadable or malformed patch file fails the load.
    pub fn load(&mut self) -> anyhow::Result<usize> {
        let mut records: Vec<Record> = self.store.load()?;
        for record in &mut records {
            record.derive_url_validity();
        }

        if let Some(path) = &self.patch_file {
            let outcome = PatchApplier::load(path)?.apply(&mut records);
            info!(
                applied = outcome.applied,
                unmatched = outcome.unmatched,
                rejected = outcome.rejected,
                "patches applied"
            );
        }

        self.records = records;
        info!(count = self.records.len(), path = %self.store.path().display(), "loaded records");
        Ok(self.records.len())
    }

    /// Persists the whole collection sorted by title.
    pub fn save(&self) -> anyhow::Result<()> {
        let mut sorted: Vec<&Record> = self.records.iter().collect();
        sorted.sort_by(|a, b| a.title.cmp(&b.title));
        self.store.save(&sorted)?;
        info!(count = sorted.len(), path = %self.store.path().display(), "saved records");
        Ok(())
    }
}
