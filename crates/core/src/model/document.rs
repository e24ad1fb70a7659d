use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ItemId, PartialUpdate};
use crate::error::ProgressError;

/// The single persisted mapping from item id to completion state.
///
/// Always serializes as a JSON object. Keys are kept ordered so the
/// persisted file is stable between writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressDocument {
    items: BTreeMap<ItemId, bool>,
}

impl ProgressDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse persisted document text.
    ///
    /// Blank input is treated as an empty document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Corrupt` if the text is not JSON or is not an
    /// object of booleans.
    pub fn from_json_str(raw: &str) -> Result<Self, ProgressError> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|err| ProgressError::Corrupt(err.to_string()))?;
        Self::from_value(value).map_err(|err| match err {
            ProgressError::Corrupt(msg) => ProgressError::Corrupt(msg),
            other => ProgressError::Corrupt(other.to_string()),
        })
    }

    /// Build a document from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same validation as `PartialUpdate::from_value`.
    pub fn from_value(value: Value) -> Result<Self, ProgressError> {
        let items = super::parse_entries(value)?;
        Ok(Self { items })
    }

    /// Parse persisted text, keeping whatever valid entries it holds.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Corrupt` only if the text is not JSON or its
    /// top level is not an object.
    pub fn salvage_json_str(raw: &str) -> Result<Salvaged, ProgressError> {
        if raw.trim().is_empty() {
            return Ok(Salvaged::default());
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|err| ProgressError::Corrupt(err.to_string()))?;
        Self::salvage_value(value).map_err(|err| ProgressError::Corrupt(err.to_string()))
    }

    /// # Errors
    ///
    /// Returns `ProgressError::NotAnObject` if `value` is not an object.
    pub fn salvage_value(value: Value) -> Result<Salvaged, ProgressError> {
        let (items, dropped) = super::salvage_entries(value)?;
        Ok(Salvaged {
            document: Self { items },
            dropped,
        })
    }

    /// Two-space indented JSON, the on-disk format.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Corrupt` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ProgressError> {
        serde_json::to_string_pretty(self).map_err(|err| ProgressError::Corrupt(err.to_string()))
    }

    /// Shallow union: keys in `update` overwrite, everything else is kept.
    pub fn merge(&mut self, update: &PartialUpdate) {
        for (id, done) in update.iter() {
            self.items.insert(id.clone(), done);
        }
    }

    /// Consuming variant of [`merge`](Self::merge).
    #[must_use]
    pub fn merged(mut self, update: &PartialUpdate) -> Self {
        self.merge(update);
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<bool> {
        self.items.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, bool)> + '_ {
        self.items.iter().map(|(id, done)| (id, *done))
    }
}

/// A document recovered from stored content, plus the keys that had to go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Salvaged {
    pub document: ProgressDocument,
    pub dropped: Vec<String>,
}

impl Salvaged {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

impl FromIterator<(ItemId, bool)> for ProgressDocument {
    fn from_iter<T: IntoIterator<Item = (ItemId, bool)>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: Value) -> PartialUpdate {
        PartialUpdate::from_value(value).unwrap()
    }

    #[test]
    fn blank_text_is_empty_document() {
        assert!(ProgressDocument::from_json_str("").unwrap().is_empty());
        assert!(ProgressDocument::from_json_str("  \n").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_corrupt() {
        let err = ProgressDocument::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ProgressError::Corrupt(_)));
    }

    #[test]
    fn non_object_json_is_corrupt() {
        for raw in ["[]", "null", "42", "\"x\"", r#"{"a": 1}"#] {
            let err = ProgressDocument::from_json_str(raw).unwrap_err();
            assert!(matches!(err, ProgressError::Corrupt(_)), "{raw}");
        }
    }

    #[test]
    fn salvage_keeps_valid_entries_and_names_the_rest() {
        let salvaged = ProgressDocument::salvage_json_str(
            r#"{"week-1": true, "week-2": false, "note": null, "": true, "n": 3}"#,
        )
        .unwrap();
        assert_eq!(salvaged.document.len(), 2);
        assert_eq!(salvaged.document.get("week-1"), Some(true));
        assert_eq!(salvaged.document.get("week-2"), Some(false));
        assert_eq!(salvaged.dropped, vec!["", "n", "note"]);
        assert!(!salvaged.is_clean());
    }

    #[test]
    fn salvage_rejects_non_objects_and_bad_json() {
        for raw in ["[]", "null", "\"x\"", "{broken"] {
            assert!(
                matches!(ProgressDocument::salvage_json_str(raw), Err(ProgressError::Corrupt(_))),
                "{raw}"
            );
        }
        assert!(ProgressDocument::salvage_json_str(" ").unwrap().is_clean());
    }

    #[test]
    fn merging_empty_update_is_a_no_op() {
        let doc = ProgressDocument::from_value(json!({"a": true, "b": false})).unwrap();
        let merged = doc.clone().merged(&PartialUpdate::new());
        assert_eq!(merged, doc);
    }

    #[test]
    fn merge_overwrites_present_keys_and_keeps_the_rest() {
        let mut doc = ProgressDocument::from_value(json!({"a": true, "b": false})).unwrap();
        doc.merge(&update(json!({"a": false, "c": true})));
        assert_eq!(doc.get("a"), Some(false));
        assert_eq!(doc.get("b"), Some(false));
        assert_eq!(doc.get("c"), Some(true));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn checklist_scenario() {
        let mut doc = ProgressDocument::new();
        doc.merge(&update(json!({"a": true})));
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": true}));
        doc.merge(&update(json!({"b": false})));
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"a": true, "b": false})
        );
        doc.merge(&update(json!({"a": false})));
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"a": false, "b": false})
        );
    }

    #[test]
    fn empty_document_serializes_as_object() {
        let text = ProgressDocument::new().to_json_pretty().unwrap();
        assert_eq!(text, "{}");
    }

    #[test]
    fn pretty_output_round_trips() {
        let doc = ProgressDocument::from_value(json!({"b": true, "a": false})).unwrap();
        let text = doc.to_json_pretty().unwrap();
        assert_eq!(text, "{\n  \"a\": false,\n  \"b\": true\n}");
        assert_eq!(ProgressDocument::from_json_str(&text).unwrap(), doc);
    }
}
