//! Manual single-field overrides applied once at load time.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use gamedex_core::{MergePolicy, Patch, Record, RecordId};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub applied: usize,
    /// Patches naming an unknown record or field.
    pub unmatched: usize,
    /// Patches whose value does not fit the field.
    pub rejected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PatchApplier {
    patches: Vec<Patch>,
}

impl PatchApplier {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    /// Reads the patch file. A missing file means no patches; an unreadable or
    /// malformed one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let patches = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self { patches })
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Applies patches in file order, so a later patch of the same field wins.
    /// Current values are ignored. A value the field cannot hold is logged and
    /// skipped; it never stops the remaining patches.
    pub fn apply(&self, records: &mut [Record]) -> PatchOutcome {
        let by_id: HashMap<RecordId, usize> = records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.id.clone(), idx))
            .collect();

        let mut outcome = PatchOutcome::default();
        for patch in &self.patches {
            let Some(&idx) = by_id.get(&patch.id) else {
                warn!(id = %patch.id, key = %patch.key, "patch targets unknown record");
                outcome.unmatched += 1;
                continue;
            };
            if !Record::has_field(&patch.key) || patch.key == "id" {
                warn!(id = %patch.id, key = %patch.key, "patch targets unknown field");
                outcome.unmatched += 1;
                continue;
            }
            match records[idx].assign(&patch.key, &patch.value, MergePolicy::Replace) {
                Ok(_) => {
                    debug!(id = %patch.id, key = %patch.key, "patch applied");
                    outcome.applied += 1;
                }
                Err(err) => {
                    warn!(id = %patch.id, key = %patch.key, error = %err, "patch value rejected");
                    outcome.rejected += 1;
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn patch(id: &RecordId, key: &str, value: serde_json::Value) -> Patch {
        Patch {
            id: id.clone(),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn later_patches_win_and_unknown_targets_are_skipped() {
        let mut records = vec![Record::default(), Record::default()];
        records[0].title = "Scraped".into();
        records[1].my_tags = vec!["a".into(), "b".into()];
        let first = records[0].id.clone();
        let second = records[1].id.clone();

        let applier = PatchApplier::new(vec![
            patch(&first, "title", json!("Manual")),
            patch(&first, "title", json!("Manual Final")),
            patch(&second, "my_tags", json!(["b"])),
            patch(&second, "no_such_field", json!(1)),
            patch(&RecordId::from("ghost"), "title", json!("x")),
        ]);

        let outcome = applier.apply(&mut records);
        assert_eq!(
            outcome,
            PatchOutcome {
                applied: 3,
                unmatched: 2,
                rejected: 0,
            }
        );
        assert_eq!(records[0].title, "Manual Final");
        assert_eq!(records[1].my_tags, vec!["b".to_string()]);
    }

    #[test]
    fn patch_can_mark_url_invalid() {
        let mut records = vec![Record::from_url("https://f95zone.to/threads/x")];
        let id = records[0].id.clone();
        PatchApplier::new(vec![patch(&id, "url_is_valid", json!(false))]).apply(&mut records);
        assert!(!records[0].url_is_valid);
    }

    #[test]
    fn ill_fitting_value_is_skipped_and_later_patches_still_apply() {
        let mut records = vec![Record::default()];
        records[0].my_rating = "4".into();
        let id = records[0].id.clone();

        let outcome = PatchApplier::new(vec![
            patch(&id, "my_rating", json!({"stars": 5})),
            patch(&id, "status", json!("finished")),
            patch(&id, "my_comment", json!("replay later")),
        ])
        .apply(&mut records);

        assert_eq!(
            outcome,
            PatchOutcome {
                applied: 1,
                unmatched: 0,
                rejected: 2,
            }
        );
        assert_eq!(records[0].my_rating, "4");
        assert_eq!(records[0].my_comment, "replay later");
    }

    #[test]
    fn missing_file_is_empty_but_malformed_file_fails() {
        let dir = tempdir().unwrap();
        assert!(PatchApplier::load(&dir.path().join("absent.json"))
            .unwrap()
            .patches()
            .is_empty());

        let path = dir.path().join("patches.json");
        fs::write(&path, r#"[{"id": "x", "key": "title"}]"#).unwrap();
        assert!(PatchApplier::load(&path).is_err());

        fs::write(&path, r#"[{"id": "x", "key": "title", "value": "T"}]"#).unwrap();
        assert_eq!(PatchApplier::load(&path).unwrap().patches().len(), 1);
    }
}
