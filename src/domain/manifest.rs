// ============================================================
// Layer 3 — Manifest Domain Types
// ============================================================
// One manifest row per image file found under
// `root/<label_name>/<image_file>`, plus the dense label
// factorization that turns label names into integer ids.
//
// Factorization example (first-seen order):
//   ["audi_a4", "bmw_x5", "audi_a4", "ford_focus"]
//        → ids [0, 1, 0, 2]
//
// The ids are only stable within one build run; a rebuild over
// a changed directory tree may assign different ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Column names of the manifest file, in order.
pub const MANIFEST_COLUMNS: [&str; 4] = ["image_name", "image_path", "label_name", "label"];

/// An image discovered on disk before labels are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub image_name: String,
    pub image_path: String,
    pub label_name: String,
}

impl ImageEntry {
    pub fn new(
        image_name: impl Into<String>,
        image_path: impl Into<String>,
        label_name: impl Into<String>,
    ) -> Self {
        Self {
            image_name: image_name.into(),
            image_path: image_path.into(),
            label_name: label_name.into(),
        }
    }
}

/// One row of a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub image_name: String,
    pub image_path: String,
    pub label_name: String,
    /// Dense id factorized from `label_name`.
    pub label: usize,
}

/// Bijection between label names and `[0, len)`.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    names: Vec<String>,
    ids:   HashMap<String, usize>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, assigning the next free id on first sight.
    pub fn id_or_insert(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Assign dense label ids to discovered images in first-seen order.
pub fn factorize(entries: Vec<ImageEntry>) -> (Vec<ManifestRecord>, LabelIndex) {
    let mut index = LabelIndex::new();
    let records = entries
        .into_iter()
        .map(|e| {
            let label = index.id_or_insert(&e.label_name);
            ManifestRecord {
                image_name: e.image_name,
                image_path: e.image_path,
                label_name: e.label_name,
                label,
            }
        })
        .collect();
    (records, index)
}

/// Number of distinct classes referenced by a set of rows
/// (one more than the largest label id).
pub fn num_classes(records: &[ManifestRecord]) -> usize {
    records.iter().map(|r| r.label + 1).max().unwrap_or(0)
}
