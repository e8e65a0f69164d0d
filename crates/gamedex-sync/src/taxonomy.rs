//! Persistent raw-tag to curated-category table.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gamedex_storage::write_atomic;
use tracing::{info, warn};

/// Result of deriving curated tags for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// Previously curated tags plus the contributions of this pass, sorted.
    pub curated: Vec<String>,
    /// Whether this pass registered tags the table had never seen.
    pub dirty: bool,
}

/// Tag translation table. Keys are case-folded raw tags; an empty category list
/// means the tag was seen but nobody has curated it yet.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Vec<String>>,
    dirty: bool,
}

impl Taxonomy {
    /// Table that is never written anywhere.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the table from `path`. A missing or unreadable file yields an empty table.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(Some(entries)) => entries,
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "taxonomy unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
            dirty: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn categories(&self, tag: &str) -> Option<&[String]> {
        self.entries.get(&tag.to_lowercase()).map(Vec::as_slice)
    }

    /// Curates a tag by hand. Marks the table dirty.
    pub fn set_categories<I, S>(&mut self, tag: &str, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            tag.to_lowercase(),
            categories.into_iter().map(Into::into).collect(),
        );
        self.dirty = true;
    }

    /// Maps raw tags to curated categories, registering unseen tags with an empty
    /// category list. The result never drops a previously curated tag.
    pub fn derive(&mut self, raw_tags: &[String], previously_curated: &[String]) -> Derivation {
        let mut curated: BTreeSet<String> = previously_curated.iter().cloned().collect();
        let mut dirty = false;

        for tag in raw_tags {
            let folded = tag.to_lowercase();
            match self.entries.get(&folded) {
                Some(categories) => {
                    curated.extend(categories.iter().filter(|c| !c.is_empty()).cloned());
                }
                None => {
                    info!(tag = %folded, "new tag found");
                    self.entries.insert(folded, Vec::new());
                    dirty = true;
                }
            }
        }

        self.dirty |= dirty;
        Derivation {
            curated: curated.into_iter().collect(),
            dirty,
        }
    }

    /// Deterministic serialization: sorted keys, sorted category lists, one entry
    /// per line. Unchanged tables render byte-for-byte identically.
    pub fn render(&self) -> String {
        let mut out = String::from("{\n");
        let total = self.entries.len();
        for (idx, (tag, categories)) in self.entries.iter().enumerate() {
            let mut sorted = categories.clone();
            sorted.sort();
            let values = sorted
                .iter()
                .map(|c| json_string(c))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("    {}: [{}]", json_string(tag), values));
            out.push_str(if idx + 1 < total { ",\n" } else { "\n" });
        }
        out.push_str("}\n");
        out
    }

    /// Rewrites the whole file. No backup of the previous content is kept.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(path, self.render().as_bytes())
            .with_context(|| format!("writing taxonomy {}", path.display()))
    }

    /// Saves only when new tags were registered since the last flush.
    pub fn flush(&mut self) -> anyhow::Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        self.dirty = false;
        Ok(true)
    }
}

fn read_entries(path: &Path) -> anyhow::Result<Option<BTreeMap<String, Vec<String>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(entries))
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
