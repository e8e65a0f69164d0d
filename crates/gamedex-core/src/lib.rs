//! Core record model, field vocabulary and version ledger for gamedex.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "gamedex-core";

/// Flat field map exchanged between adapters, patches and records. Keys use the
/// record's serialized field names.
pub type FieldMap = serde_json::Map<String, Value>;

/// Every field name a [`Record`] exposes, in declaration order.
pub const FIELD_NAMES: &[&str] = &[
    "id",
    "url",
    "title",
    "description",
    "developer",
    "source",
    "url_is_valid",
    "watch",
    "cover_img",
    "versions",
    "published",
    "last_version",
    "updated",
    "os",
    "language",
    "tags",
    "my_tags",
    "my_comment",
    "my_rating",
    "game_engine",
    "game_render",
    "status",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unrecognized {kind} value {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("field {field} expects {expected}, got {found}")]
    Type {
        field: String,
        expected: &'static str,
        found: Value,
    },
}

/// Opaque record identifier. Assigned once at creation and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "abandoned")]
    Abandoned,
    /// Also known as hiatus.
    #[serde(rename = "onhold")]
    OnHold,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::OnHold => "onhold",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for GameStatus {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            "onhold" => Ok(Self::OnHold),
            "unknown" => Ok(Self::Unknown),
            other => Err(FieldError::UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEngine {
    #[serde(rename = "adrift")]
    Adrift,
    #[serde(rename = "flash")]
    Flash,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "other")]
    Other,
    #[serde(rename = "qsp")]
    Qsp,
    /// Rapid Adventure Game development System.
    #[serde(rename = "rags")]
    Rags,
    #[serde(rename = "renpy")]
    RenPy,
    #[serde(rename = "rpgm")]
    Rpgm,
    #[serde(rename = "tads")]
    Tads,
    #[serde(rename = "unity")]
    Unity,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "unreal")]
    Unreal,
    #[serde(rename = "webgl")]
    WebGl,
    #[serde(rename = "wolf rpg")]
    WolfRpg,
}

impl GameEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adrift => "adrift",
            Self::Flash => "flash",
            Self::Html => "html",
            Self::Java => "java",
            Self::Other => "other",
            Self::Qsp => "qsp",
            Self::Rags => "rags",
            Self::RenPy => "renpy",
            Self::Rpgm => "rpgm",
            Self::Tads => "tads",
            Self::Unity => "unity",
            Self::Unknown => "unknown",
            Self::Unreal => "unreal",
            Self::WebGl => "webgl",
            Self::WolfRpg => "wolf rpg",
        }
    }
}

impl FromStr for GameEngine {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adrift" => Ok(Self::Adrift),
            "flash" => Ok(Self::Flash),
            "html" => Ok(Self::Html),
            "java" => Ok(Self::Java),
            "other" => Ok(Self::Other),
            "qsp" => Ok(Self::Qsp),
            "rags" => Ok(Self::Rags),
            "renpy" => Ok(Self::RenPy),
            "rpgm" => Ok(Self::Rpgm),
            "tads" => Ok(Self::Tads),
            "unity" => Ok(Self::Unity),
            "unknown" => Ok(Self::Unknown),
            "unreal" => Ok(Self::Unreal),
            "webgl" => Ok(Self::WebGl),
            "wolf rpg" => Ok(Self::WolfRpg),
            other => Err(FieldError::UnknownVariant {
                kind: "game_engine",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameRender {
    #[serde(rename = "honey select")]
    HoneySelect,
    #[serde(rename = "honey select 2")]
    HoneySelect2,
    #[serde(rename = "daz")]
    Daz,
    #[serde(rename = "koikatsu")]
    Koikatsu,
    #[serde(rename = "hand drawn")]
    HandDrawn,
    #[serde(rename = "vam")]
    Vam,
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "tk17")]
    Tk17,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl GameRender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HoneySelect => "honey select",
            Self::HoneySelect2 => "honey select 2",
            Self::Daz => "daz",
            Self::Koikatsu => "koikatsu",
            Self::HandDrawn => "hand drawn",
            Self::Vam => "vam",
            Self::Ai => "ai",
            Self::Tk17 => "tk17",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for GameRender {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "honey select" => Ok(Self::HoneySelect),
            "honey select 2" => Ok(Self::HoneySelect2),
            "daz" => Ok(Self::Daz),
            "koikatsu" => Ok(Self::Koikatsu),
            "hand drawn" => Ok(Self::HandDrawn),
            "vam" => Ok(Self::Vam),
            "ai" => Ok(Self::Ai),
            "tk17" => Ok(Self::Tk17),
            "unknown" => Ok(Self::Unknown),
            other => Err(FieldError::UnknownVariant {
                kind: "game_render",
                value: other.to_string(),
            }),
        }
    }
}

/// Append-only mapping from version label to the date it was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionLedger(BTreeMap<String, String>);

impl VersionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `label` as first seen on `date`. An existing label keeps its date;
    /// returns whether the label was new.
    pub fn record(&mut self, label: &str, date: &str) -> bool {
        if self.0.contains_key(label) {
            return false;
        }
        self.0.insert(label.to_string(), date.to_string());
        true
    }

    pub fn first_seen(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// How [`Record::assign`] treats a field that already holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Replace unconditionally.
    Overwrite,
    /// Replace only when the current value is empty.
    FillEmpty,
    /// Manual override: replace unconditionally, including the curated tag set and
    /// the version ledger which automated merges only ever grow.
    Replace,
}

impl MergePolicy {
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            Self::Overwrite
        } else {
            Self::FillEmpty
        }
    }
}

/// Canonical metadata for one tracked project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: RecordId,
    pub url: String,
    pub title: String,
    pub description: String,
    pub developer: String,
    /// Adapter name that produced the last successful merge.
    pub source: String,
    pub url_is_valid: bool,
    pub watch: bool,
    pub cover_img: String,
    pub versions: VersionLedger,
    pub published: String,
    pub last_version: String,
    pub updated: String,
    pub os: Vec<String>,
    pub language: Vec<String>,
    pub tags: Vec<String>,
    pub my_tags: Vec<String>,
    pub my_comment: String,
    pub my_rating: String,
    #[serde(deserialize_with = "null_as_default")]
    pub game_engine: GameEngine,
    #[serde(deserialize_with = "null_as_default")]
    pub game_render: GameRender,
    #[serde(deserialize_with = "null_as_default")]
    pub status: GameStatus,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: RecordId::generate(),
            url: String::new(),
            title: String::new(),
            description: String::new(),
            developer: String::new(),
            source: String::new(),
            url_is_valid: false,
            watch: true,
            cover_img: String::new(),
            versions: VersionLedger::new(),
            published: String::new(),
            last_version: String::new(),
            updated: String::new(),
            os: Vec::new(),
            language: Vec::new(),
            tags: Vec::new(),
            my_tags: Vec::new(),
            my_comment: String::new(),
            my_rating: String::new(),
            game_engine: GameEngine::Unknown,
            game_render: GameRender::Unknown,
            status: GameStatus::Unknown,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Bare record awaiting its first reconciliation pass.
    pub fn from_url(url: impl Into<String>) -> Self {
        let mut record = Self {
            url: url.into(),
            ..Self::default()
        };
        record.derive_url_validity();
        record
    }

    /// Marks the URL valid once it is non-empty. No network check is performed.
    pub fn derive_url_validity(&mut self) {
        if !self.url.is_empty() {
            self.url_is_valid = true;
        }
    }

    pub fn has_field(key: &str) -> bool {
        FIELD_NAMES.contains(&key)
    }

    pub fn to_field_map(&self) -> FieldMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => FieldMap::new(),
        }
    }

    /// Serialized value of a single field, `None` for names the record lacks.
    pub fn field_value(&self, key: &str) -> Option<Value> {
        if !Self::has_field(key) {
            return None;
        }
        self.to_field_map().remove(key)
    }

    /// Assigns every recognised key of `fields` under the given policy. Unknown keys
    /// are ignored; the identifier is never touched. All or nothing: on error the
    /// record is left as it was.
    pub fn apply_fields(&mut self, fields: &FieldMap, policy: MergePolicy) -> Result<(), FieldError> {
        let mut staged = self.clone();
        for (key, value) in fields {
            staged.assign(key, value, policy)?;
        }
        *self = staged;
        Ok(())
    }

    /// Assigns one field. Returns `Ok(false)` when the key is not a record field, is
    /// the identifier, or the policy kept the current value.
    ///
    /// Enumeration strings are converted before the policy is consulted, so an
    /// unrecognised value is an error even when it would not have been applied.
    pub fn assign(&mut self, key: &str, value: &Value, policy: MergePolicy) -> Result<bool, FieldError> {
        let applied = match key {
            "url" => {
                let applied = set_slot(&mut self.url, string_value(key, value)?, policy);
                if applied {
                    self.derive_url_validity();
                }
                applied
            }
            "title" => set_slot(&mut self.title, string_value(key, value)?, policy),
            "description" => set_slot(&mut self.description, string_value(key, value)?, policy),
            "developer" => set_slot(&mut self.developer, string_value(key, value)?, policy),
            "source" => set_slot(&mut self.source, string_value(key, value)?, policy),
            "cover_img" => set_slot(&mut self.cover_img, string_value(key, value)?, policy),
            "published" => set_slot(&mut self.published, string_value(key, value)?, policy),
            "last_version" => set_slot(&mut self.last_version, string_value(key, value)?, policy),
            "updated" => set_slot(&mut self.updated, string_value(key, value)?, policy),
            "my_comment" => set_slot(&mut self.my_comment, string_value(key, value)?, policy),
            "my_rating" => set_slot(&mut self.my_rating, string_value(key, value)?, policy),
            "url_is_valid" => set_slot(&mut self.url_is_valid, bool_value(key, value)?, policy),
            "watch" => set_slot(&mut self.watch, bool_value(key, value)?, policy),
            "os" => set_slot(&mut self.os, string_list(key, value)?, policy),
            "language" => set_slot(&mut self.language, string_list(key, value)?, policy),
            "tags" => set_slot(&mut self.tags, string_list(key, value)?, policy),
            "my_tags" => {
                let incoming = string_list(key, value)?;
                if policy == MergePolicy::Replace {
                    self.my_tags = incoming;
                    true
                } else {
                    self.union_my_tags(incoming)
                }
            }
            "versions" => {
                let incoming = ledger_value(key, value)?;
                if policy == MergePolicy::Replace {
                    self.versions = incoming;
                    true
                } else {
                    incoming
                        .iter()
                        .fold(false, |grew, (label, date)| self.versions.record(label, date) || grew)
                }
            }
            "game_engine" => set_slot(&mut self.game_engine, enum_value(key, value)?, policy),
            "game_render" => set_slot(&mut self.game_render, enum_value(key, value)?, policy),
            "status" => set_slot(&mut self.status, enum_value(key, value)?, policy),
            _ => false,
        };
        Ok(applied)
    }

    /// Adds curated tags without removing any; keeps the set sorted. Returns whether
    /// the set grew.
    pub fn union_my_tags<I>(&mut self, tags: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let mut set: BTreeSet<String> = self.my_tags.drain(..).collect();
        let before = set.len();
        set.extend(tags.into_iter().filter(|t| !t.is_empty()));
        let grew = set.len() > before;
        self.my_tags = set.into_iter().collect();
        grew
    }

    /// Deduplicates and sorts the raw tag list.
    pub fn normalize_tags(&mut self) {
        let set: BTreeSet<String> = self.tags.drain(..).collect();
        self.tags = set.into_iter().collect();
    }
}

/// Field emptiness as seen by a sparse merge.
trait Emptiness {
    fn is_empty_value(&self) -> bool;
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for bool {
    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl Emptiness for Vec<String> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for GameStatus {
    fn is_empty_value(&self) -> bool {
        *self == GameStatus::Unknown
    }
}

impl Emptiness for GameEngine {
    fn is_empty_value(&self) -> bool {
        *self == GameEngine::Unknown
    }
}

impl Emptiness for GameRender {
    fn is_empty_value(&self) -> bool {
        *self == GameRender::Unknown
    }
}

fn set_slot<T: Emptiness>(slot: &mut T, value: T, policy: MergePolicy) -> bool {
    if policy == MergePolicy::FillEmpty && !slot.is_empty_value() {
        return false;
    }
    *slot = value;
    true
}

fn type_error(field: &str, expected: &'static str, found: &Value) -> FieldError {
    FieldError::Type {
        field: field.to_string(),
        expected,
        found: found.clone(),
    }
}

fn string_value(field: &str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(type_error(field, "string", other)),
    }
}

fn bool_value(field: &str, value: &Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(type_error(field, "bool", other)),
    }
}

fn string_list(field: &str, value: &Value) -> Result<Vec<String>, FieldError> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| string_value(field, item))
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(type_error(field, "list of strings", other)),
    }
}

fn ledger_value(field: &str, value: &Value) -> Result<VersionLedger, FieldError> {
    match value {
        Value::Object(entries) => {
            let mut ledger = VersionLedger::new();
            for (label, date) in entries {
                ledger.record(label, &string_value(field, date)?);
            }
            Ok(ledger)
        }
        Value::Null => Ok(VersionLedger::new()),
        other => Err(type_error(field, "object of version dates", other)),
    }
}

/// Empty strings and nulls carry no evidence and map to the `unknown` member.
fn enum_value<T>(field: &str, value: &Value) -> Result<T, FieldError>
where
    T: FromStr<Err = FieldError> + Default,
{
    match value {
        Value::Null => Ok(T::default()),
        Value::String(s) if s.is_empty() => Ok(T::default()),
        Value::String(s) => s.parse(),
        other => Err(type_error(field, "string", other)),
    }
}

/// Manual single-field override applied at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub id: RecordId,
    pub key: String,
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn fill_empty_keeps_existing_values() {
        let mut record = Record::from_url("https://f95zone.to/threads/x");
        record.title = "Keep Me".into();
        record.tags = vec!["kept".into()];

        record
            .apply_fields(
                &fields(json!({"title": "Other", "developer": "Dev", "tags": ["new"]})),
                MergePolicy::FillEmpty,
            )
            .unwrap();

        assert_eq!(record.title, "Keep Me");
        assert_eq!(record.developer, "Dev");
        assert_eq!(record.tags, vec!["kept".to_string()]);
    }

    #[test]
    fn overwrite_replaces_but_never_touches_id() {
        let mut record = Record::from_url("https://f95zone.to/threads/x");
        let id = record.id.clone();
        record.title = "Old".into();

        record
            .apply_fields(
                &fields(json!({"id": "forged", "title": "New", "status": "completed"})),
                MergePolicy::Overwrite,
            )
            .unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.title, "New");
        assert_eq!(record.status, GameStatus::Completed);
    }

    #[test]
    fn unrecognized_enum_value_is_an_error_even_when_not_applied() {
        let mut record = Record::default();
        record.game_engine = GameEngine::RenPy;

        let err = record
            .assign("game_engine", &json!("cobol"), MergePolicy::FillEmpty)
            .unwrap_err();

        assert_eq!(
            err,
            FieldError::UnknownVariant {
                kind: "game_engine",
                value: "cobol".into()
            }
        );
        assert_eq!(record.game_engine, GameEngine::RenPy);
    }

    #[test]
    fn failed_apply_leaves_record_untouched() {
        let mut record = Record::from_url("https://example.com/g/1");
        record.title = "Old".into();
        let before = record.clone();

        let err = record
            .apply_fields(
                &fields(json!({
                    "description": "new description",
                    "title": "New",
                    "game_engine": "cobol",
                    "updated": "2025-01-01",
                })),
                MergePolicy::Overwrite,
            )
            .unwrap_err();
        assert!(matches!(err, FieldError::UnknownVariant { .. }));
        assert_eq!(record, before);
    }

    #[test]
    fn empty_enum_string_means_unknown() {
        let mut record = Record::default();
        record
            .assign("game_render", &json!(""), MergePolicy::Overwrite)
            .unwrap();
        assert_eq!(record.game_render, GameRender::Unknown);
        record
            .assign("game_render", &json!("honey select 2"), MergePolicy::Overwrite)
            .unwrap();
        assert_eq!(record.game_render, GameRender::HoneySelect2);
    }

    #[test]
    fn automated_merges_only_grow_my_tags_and_versions() {
        let mut record = Record::default();
        record.my_tags = vec!["romance".into()];
        record.versions.record("0.1", "2024-01-01");

        record
            .apply_fields(
                &fields(json!({
                    "my_tags": ["sandbox"],
                    "versions": {"0.1": "2030-01-01", "0.2": "2024-02-01"}
                })),
                MergePolicy::Overwrite,
            )
            .unwrap();

        assert_eq!(record.my_tags, vec!["romance".to_string(), "sandbox".to_string()]);
        assert_eq!(record.versions.first_seen("0.1"), Some("2024-01-01"));
        assert_eq!(record.versions.first_seen("0.2"), Some("2024-02-01"));
    }

    #[test]
    fn replace_policy_can_shrink_curated_tags() {
        let mut record = Record::default();
        record.my_tags = vec!["a".into(), "b".into()];
        record
            .assign("my_tags", &json!(["a"]), MergePolicy::Replace)
            .unwrap();
        assert_eq!(record.my_tags, vec!["a".to_string()]);
    }

    #[test]
    fn wrong_json_type_is_reported() {
        let mut record = Record::default();
        let err = record
            .assign("tags", &json!("not-a-list"), MergePolicy::Overwrite)
            .unwrap_err();
        assert!(matches!(err, FieldError::Type { ref field, .. } if field == "tags"));
    }

    #[test]
    fn assigning_a_url_marks_it_valid() {
        let mut record = Record::default();
        assert!(!record.url_is_valid);
        record
            .assign("url", &json!("https://lewdcorner.com/threads/y"), MergePolicy::FillEmpty)
            .unwrap();
        assert!(record.url_is_valid);
    }

    #[test]
    fn stored_null_enums_restore_as_unknown() {
        let record: Record = serde_json::from_value(json!({
            "id": "abc",
            "title": "Stored",
            "status": null,
            "game_engine": "wolf rpg",
            "game_render": null
        }))
        .unwrap();
        assert_eq!(record.id.as_str(), "abc");
        assert_eq!(record.status, GameStatus::Unknown);
        assert_eq!(record.game_engine, GameEngine::WolfRpg);
        assert!(record.watch);
    }

    #[test]
    fn ledger_keeps_first_seen_date() {
        let mut ledger = VersionLedger::new();
        assert!(ledger.record("1.0", "2024-05-01"));
        assert!(!ledger.record("1.0", "2025-01-01"));
        assert_eq!(ledger.first_seen("1.0"), Some("2024-05-01"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn field_value_reads_serialized_names() {
        let mut record = Record::default();
        record.developer = "Studio".into();
        record.game_engine = GameEngine::WolfRpg;
        assert_eq!(record.field_value("developer"), Some(json!("Studio")));
        assert_eq!(record.field_value("game_engine"), Some(json!("wolf rpg")));
        assert_eq!(record.field_value("nope"), None);
    }
}
