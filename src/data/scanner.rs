// ============================================================
// Layer 4 — Directory Scanner
// ============================================================
// Walks a dataset laid out as one subdirectory per class:
//
//   root/
//     audi_a4_2008/
//       0001.jpg
//       0002.jpg
//     bmw_x5_2010/
//       0001.jpg
//
// Every immediate subdirectory is a class; every file inside
// one is an image of that class. Files are NOT filtered by
// extension — a stray non-image fails later, at decode time.
//
// Entries are visited in name order so that the first-seen
// label order (and therefore the label ids) is reproducible.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::{VmmrError, VmmrResult};
use crate::domain::manifest::ImageEntry;
use crate::domain::traits::ImageSource;

/// Scans `root/<label_name>/<image_file>`.
pub struct DirectoryScanner {
    root: PathBuf,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Immediate subdirectories of `root`, sorted by name.
    fn class_dirs(&self) -> VmmrResult<Vec<(String, PathBuf)>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| VmmrError::fs(&self.root, e))? {
            let entry = entry.map_err(|e| VmmrError::fs(&self.root, e))?;
            let path  = entry.path();
            if path.is_dir() {
                dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }
}

impl ImageSource for DirectoryScanner {
    fn classes(&self) -> VmmrResult<Vec<String>> {
        let classes: Vec<String> = self.class_dirs()?.into_iter().map(|(name, _)| name).collect();
        tracing::debug!("Found {} class directories under '{}'", classes.len(), self.root.display());
        Ok(classes)
    }

    fn entries(&self) -> VmmrResult<Vec<ImageEntry>> {
        let mut entries = Vec::new();

        for (label_name, dir) in self.class_dirs()? {
            let mut files = Vec::new();
            for entry in fs::read_dir(&dir).map_err(|e| VmmrError::fs(&dir, e))? {
                let entry = entry.map_err(|e| VmmrError::fs(&dir, e))?;
                let path  = entry.path();
                if path.is_file() {
                    files.push((entry.file_name().to_string_lossy().into_owned(), path));
                }
            }
            files.sort_by(|a, b| a.0.cmp(&b.0));

            if files.is_empty() {
                tracing::debug!("Class '{}' has no files", label_name);
            }

            for (image_name, path) in files {
                entries.push(ImageEntry::new(
                    image_name,
                    path.to_string_lossy(),
                    label_name.as_str(),
                ));
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_classes_are_subdirectories_only() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("bmw_x5")).unwrap();
        fs::create_dir(tmp.path().join("audi_a4")).unwrap();
        touch(&tmp.path().join("README.txt"));

        let scanner = DirectoryScanner::new(tmp.path());
        assert_eq!(scanner.classes().unwrap(), vec!["audi_a4", "bmw_x5"]);
    }

    #[test]
    fn test_entries_cover_every_file() {
        let tmp = tempfile::tempdir().unwrap();
        let audi = tmp.path().join("audi_a4");
        let ford = tmp.path().join("ford_focus");
        let empty = tmp.path().join("empty_class");
        fs::create_dir(&audi).unwrap();
        fs::create_dir(&ford).unwrap();
        fs::create_dir(&empty).unwrap();
        touch(&audi.join("1.jpg"));
        touch(&audi.join("2.jpg"));
        touch(&ford.join("notes.txt"));

        let entries = DirectoryScanner::new(tmp.path()).entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].label_name, "audi_a4");
        assert_eq!(entries[0].image_name, "1.jpg");
        // Non-image files are kept
        assert_eq!(entries[2].image_name, "notes.txt");
        // Empty class contributes nothing
        assert!(entries.iter().all(|e| e.label_name != "empty_class"));
    }

    #[test]
    fn test_missing_root_is_filesystem_error() {
        let scanner = DirectoryScanner::new("/definitely/not/here");
        assert!(matches!(scanner.classes(), Err(VmmrError::FileSystem { .. })));
    }
}
