mod document;
mod ids;
mod update;

pub use document::{ProgressDocument, Salvaged};
pub use ids::ItemId;
pub use update::PartialUpdate;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ProgressError;

/// Shared parser for anything shaped like `{ [id: string]: boolean }`.
fn parse_entries(value: Value) -> Result<BTreeMap<ItemId, bool>, ProgressError> {
    let Value::Object(map) = value else {
        return Err(ProgressError::NotAnObject);
    };

    let mut entries = BTreeMap::new();
    for (key, value) in map {
        let Value::Bool(done) = value else {
            return Err(ProgressError::NonBooleanValue { item: key });
        };
        entries.insert(ItemId::new(key)?, done);
    }
    Ok(entries)
}

/// Lenient counterpart of `parse_entries`: keeps every `id: boolean` pair and
/// reports the keys that were not one. Only a non-object is an error.
fn salvage_entries(value: Value) -> Result<(BTreeMap<ItemId, bool>, Vec<String>), ProgressError> {
    let Value::Object(map) = value else {
        return Err(ProgressError::NotAnObject);
    };

    let mut entries = BTreeMap::new();
    let mut dropped = Vec::new();
    for (key, value) in map {
        match (value, ItemId::new(key.clone())) {
            (Value::Bool(done), Ok(id)) => {
                entries.insert(id, done);
            }
            _ => dropped.push(key),
        }
    }
    Ok((entries, dropped))
}
