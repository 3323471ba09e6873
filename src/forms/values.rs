//! Submitted form values, keyed by field path.
//!
//! Paths join property names and array indices with dots: `query`,
//! `filter.lang`, `tags.0`, `items.1.name`. Every array entry also carries a
//! marker key `<array>.<i>#` so that entries whose inputs submit nothing (an
//! unchecked toggle, an empty nested group) still exist.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::schema::{FieldKind, SchemaField};

/// Suffix of array entry marker keys.
pub const ENTRY_MARKER: char = '#';

/// Key of the form button that edits array entries instead of submitting.
pub const OP_KEY: &str = "__op";

/// Flat map of field path → submitted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: BTreeMap<String, String>,
}

/// Array edit requested by a form button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOp {
    /// `add:<array path>`
    AddEntry(String),
    /// `remove:<array path>.<index>`
    RemoveEntry(String),
}

impl FormOp {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (verb, path) = raw.split_once(':')?;
        if path.is_empty() {
            return None;
        }
        match verb {
            "add" => Some(Self::AddEntry(path.to_string())),
            "remove" => Some(Self::RemoveEntry(path.to_string())),
            _ => None,
        }
    }
}

/// Child path of `parent` for a property or index.
#[must_use]
pub fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

#[must_use]
pub fn entry_marker(array_path: &str, index: usize) -> String {
    format!("{array_path}.{index}{ENTRY_MARKER}")
}

impl FormValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from posted `(name, value)` pairs; later duplicates win.
    /// Returns the values and the requested array edit, if any.
    pub fn from_pairs<I>(pairs: I) -> (Self, Option<FormOp>)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut values = BTreeMap::new();
        let mut op = None;
        for (k, v) in pairs {
            if k == OP_KEY {
                op = FormOp::parse(&v);
            } else {
                values.insert(k, v);
            }
        }
        (Self { values }, op)
    }

    /// Flatten a JSON value shaped like `field` into paths.
    #[must_use]
    pub fn from_json(field: &SchemaField, value: &Value) -> Self {
        let mut out = Self::new();
        out.flatten(field, "", value);
        out
    }

    /// Values a fresh form starts from: every schema `default`.
    #[must_use]
    pub fn from_defaults(root: &SchemaField) -> Self {
        let mut out = Self::new();
        out.seed_defaults(root, "");
        out
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert(path.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    /// Submitted, non-blank value at `path`.
    #[must_use]
    pub fn non_blank(&self, path: &str) -> Option<&str> {
        self.get(path).filter(|v| !v.trim().is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether anything at or below `path` was submitted non-blank
    /// (entry markers count, so added entries are kept).
    #[must_use]
    pub fn has_any_under(&self, path: &str) -> bool {
        let nested = format!("{path}.");
        self.values.iter().any(|(k, v)| {
            let under = k.starts_with(&nested);
            (under && k.ends_with(ENTRY_MARKER)) || ((under || k == path) && !v.trim().is_empty())
        })
    }

    /// Distinct entry indices present for the array at `path`, ascending.
    #[must_use]
    pub fn array_indices(&self, path: &str) -> Vec<usize> {
        let prefix = format!("{path}.");
        let indices: BTreeSet<usize> = self
            .values
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| {
                let end = rest
                    .find(|c: char| c == '.' || c == ENTRY_MARKER)
                    .unwrap_or(rest.len());
                rest[..end].parse().ok()
            })
            .collect();
        indices.into_iter().collect()
    }

    /// Apply an add/remove entry edit.
    pub fn apply(&mut self, op: &FormOp) {
        match op {
            FormOp::AddEntry(array) => {
                let next = self
                    .array_indices(array)
                    .last()
                    .map_or(0, |last| last + 1);
                self.values.insert(entry_marker(array, next), String::new());
            }
            FormOp::RemoveEntry(entry) => {
                let nested = format!("{entry}.");
                let marker = format!("{entry}{ENTRY_MARKER}");
                self.values
                    .retain(|k, _| k != entry && k != &marker && !k.starts_with(&nested));
            }
        }
    }

    fn flatten(&mut self, field: &SchemaField, path: &str, value: &Value) {
        match (&field.kind, value) {
            (_, Value::Null) => {}
            (FieldKind::Object { fields }, Value::Object(map)) => {
                for child in fields {
                    if let Some(v) = map.get(&child.name) {
                        self.flatten(child, &child_path(path, &child.name), v);
                    }
                }
            }
            (FieldKind::Array { items, .. }, Value::Array(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    self.values.insert(entry_marker(path, i), String::new());
                    self.flatten(items, &child_path(path, &i.to_string()), entry);
                }
            }
            (_, Value::String(s)) => self.insert(path, s.clone()),
            (_, other) => self.insert(path, other.to_string()),
        }
    }

    fn seed_defaults(&mut self, field: &SchemaField, path: &str) {
        if let Some(default) = &field.default {
            self.flatten(field, path, default);
            return;
        }
        for child in field.fields() {
            self.seed_defaults(child, &child_path(path, &child.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::schema::parse_input_schema;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn array_indices_tolerate_gaps_and_markers() {
        let (values, op) = FormValues::from_pairs(pairs(&[
            ("tags.0", "a"),
            ("tags.3#", ""),
            ("tags.3", "b"),
            ("items.1.name", "x"),
            ("items.4#", ""),
            ("tagsextra.9", "nope"),
        ]));
        assert!(op.is_none());
        assert_eq!(values.array_indices("tags"), [0, 3]);
        assert_eq!(values.array_indices("items"), [1, 4]);
    }

    #[test]
    fn add_and_remove_entries() {
        let (mut values, op) = FormValues::from_pairs(pairs(&[
            ("tags.0#", ""),
            ("tags.0", "a"),
            ("tags.1#", ""),
            ("tags.1", "b"),
            (OP_KEY, "add:tags"),
        ]));
        let op = op.unwrap();
        values.apply(&op);
        assert_eq!(values.array_indices("tags"), [0, 1, 2]);

        values.apply(&FormOp::RemoveEntry("tags.0".into()));
        assert_eq!(values.array_indices("tags"), [1, 2]);
        assert_eq!(values.get("tags.1"), Some("b"));
    }

    #[test]
    fn defaults_seed_nested_values() {
        let root = parse_input_schema(&json!({
            "properties": {
                "limit": { "type": "integer", "default": 10 },
                "tags": { "type": "array", "items": { "type": "string" }, "default": ["x", "y"] },
                "opts": { "type": "object", "properties": { "deep": { "type": "boolean", "default": true } } }
            }
        }))
        .unwrap();
        let values = FormValues::from_defaults(&root);
        assert_eq!(values.get("limit"), Some("10"));
        assert_eq!(values.array_indices("tags"), [0, 1]);
        assert_eq!(values.get("tags.1"), Some("y"));
        assert_eq!(values.get("opts.deep"), Some("true"));
    }

    #[test]
    fn has_any_under_ignores_blank_values() {
        let (values, _) = FormValues::from_pairs(pairs(&[("filter.lang", "  "), ("other", "x")]));
        assert!(!values.has_any_under("filter"));
        assert!(values.has_any_under("other"));
    }

    #[test]
    fn op_parsing() {
        assert_eq!(
            FormOp::parse("add:a.b"),
            Some(FormOp::AddEntry("a.b".into()))
        );
        assert_eq!(FormOp::parse("remove:"), None);
        assert_eq!(FormOp::parse("explode:x"), None);
        assert_eq!(FormOp::parse("nocolon"), None);
    }
}
