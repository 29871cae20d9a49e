//! Change detection: per-collection fingerprints and change classification.
//!
//! Everything here is pure. The fingerprint of a collection depends only on
//! the fields that feed that collection's content.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use domain_tools::{CollectionName, SyncStatus, Tool, ToolField};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::fields;

/// SHA-256 (hex) over the canonical JSON of `collection`'s embedded fields.
///
/// Keys are sorted and list values are sorted, so element order never
/// changes the result. The collection name is part of the hashed object.
pub fn fingerprint(tool: &Tool, collection: CollectionName) -> String {
    let mut canonical: BTreeMap<String, Value> = BTreeMap::new();
    canonical.insert(
        "collection".to_string(),
        Value::String(collection.as_str().to_string()),
    );
    for field in fields::embedded_fields(collection) {
        canonical.insert(field.to_string(), canonicalize(tool.field_value(*field)));
    }

    let object: serde_json::Map<String, Value> = canonical.into_iter().collect();
    let digest = Sha256::digest(Value::Object(object).to_string().as_bytes());
    format!("{:x}", digest)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(canonicalize).collect();
            items.sort_by_cached_key(|v| v.to_string());
            Value::Array(items)
        }
        other => other,
    }
}

/// True when the collection has no stored hash, is marked stale, or the
/// stored hash differs from the current fingerprint.
pub fn needs_sync(tool: &Tool, collection: CollectionName) -> bool {
    let Some(state) = tool
        .sync_metadata
        .as_ref()
        .and_then(|m| m.collection(collection))
    else {
        return true;
    };

    if state.status == SyncStatus::Stale {
        return true;
    }

    match state.content_hash {
        Some(ref stored) => *stored != fingerprint(tool, collection),
        None => true,
    }
}

/// What a set of changed fields means for the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeClassification {
    /// Only payload fields changed: refresh payloads, embed nothing
    pub metadata_only: bool,
    pub affected_collections: BTreeSet<CollectionName>,
    /// Some changed field is copied into every payload, so collections
    /// that are not re-embedded still need their payload rewritten
    pub touches_metadata: bool,
}

impl ChangeClassification {
    /// Nothing to do at all
    pub fn is_noop(&self) -> bool {
        !self.metadata_only && self.affected_collections.is_empty()
    }

    /// Collections outside the affected set, in declared order
    pub fn unaffected_collections(&self) -> Vec<CollectionName> {
        CollectionName::ALL
            .iter()
            .copied()
            .filter(|c| !self.affected_collections.contains(c))
            .collect()
    }
}

/// Classify changed field names. Unknown names are ignored.
pub fn classify_change<S: AsRef<str>>(changed_fields: &[S]) -> ChangeClassification {
    let fields: Vec<ToolField> = changed_fields
        .iter()
        .filter_map(|name| ToolField::from_str(name.as_ref()).ok())
        .collect();
    classify_fields(&fields)
}

pub fn classify_fields(changed_fields: &[ToolField]) -> ChangeClassification {
    let affected_collections: BTreeSet<CollectionName> = changed_fields
        .iter()
        .flat_map(|f| fields::collections_for(*f).iter().copied())
        .collect();
    let touches_metadata = changed_fields.iter().any(|f| fields::is_payload_field(*f));

    ChangeClassification {
        metadata_only: affected_collections.is_empty() && touches_metadata,
        affected_collections,
        touches_metadata,
    }
}
