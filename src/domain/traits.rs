// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits; the data
// layer provides the concrete implementations.

use crate::domain::error::VmmrResult;
use crate::domain::manifest::ImageEntry;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Anything that can enumerate labelled images.
///
/// Implementations:
///   - DirectoryScanner → walks `root/<label_name>/<image_file>`
pub trait ImageSource {
    /// Names of the classes this source knows about.
    fn classes(&self) -> VmmrResult<Vec<String>>;

    /// Every image with its label name, in scan order.
    fn entries(&self) -> VmmrResult<Vec<ImageEntry>>;
}

// ─── IndexedDataset ───────────────────────────────────────────────────────────
/// Random access to samples by position.
///
/// `get` must fail with `VmmrError::Index` for positions outside
/// `[0, length())` and must never silently skip a bad sample.
pub trait IndexedDataset {
    type Item;

    fn length(&self) -> usize;

    fn get(&self, index: usize) -> VmmrResult<Self::Item>;
}
