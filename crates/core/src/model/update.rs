use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::ItemId;
use crate::error::ProgressError;

/// A caller-supplied mapping containing only the items being changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PartialUpdate {
    entries: BTreeMap<ItemId, bool>,
}

impl PartialUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an arbitrary JSON value as a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotAnObject` for arrays, scalars and null,
    /// `ProgressError::EmptyItemId` for an empty key and
    /// `ProgressError::NonBooleanValue` when a value is not `true`/`false`.
    pub fn from_value(value: Value) -> Result<Self, ProgressError> {
        let entries = super::parse_entries(value)?;
        Ok(Self { entries })
    }

    /// Update touching exactly one item.
    #[must_use]
    pub fn single(id: ItemId, done: bool) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(id, done);
        Self { entries }
    }

    pub fn set(&mut self, id: ItemId, done: bool) {
        self.entries.insert(id, done);
    }

    /// Fold a later update into this one; keys from `later` win.
    pub fn absorb(&mut self, later: PartialUpdate) {
        self.entries.extend(later.entries);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<bool> {
        self.entries.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, bool)> + '_ {
        self.entries.iter().map(|(id, done)| (id, *done))
    }
}

impl IntoIterator for PartialUpdate {
    type Item = (ItemId, bool);
    type IntoIter = std::collections::btree_map::IntoIter<ItemId, bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
