use std::path::Path;

use burn::data::dataset::Dataset;
use image::ImageError;

use crate::data::{manifest_io::read_manifest, transform::Transform};
use crate::domain::error::{VmmrError, VmmrResult};
use crate::domain::manifest::ManifestRecord;
use crate::domain::sample::ImageSample;
use crate::domain::traits::IndexedDataset;

/// What the data loader hands to the batcher: a decoded sample,
/// or the reason it could not be produced.
pub type SampleResult = Result<ImageSample, VmmrError>;

/// Vehicle images indexed by manifest row. Decoding happens on
/// demand in `get`, so loader workers do the expensive part.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    records:   Vec<ManifestRecord>,
    transform: Transform,
}

impl ImageDataset {
    pub fn new(records: Vec<ManifestRecord>, transform: Transform) -> Self {
        Self { records, transform }
    }

    /// Load rows from a manifest file, keeping at most `row_limit`.
    pub fn from_manifest(
        path:      impl AsRef<Path>,
        row_limit: Option<usize>,
        transform: Transform,
    ) -> VmmrResult<Self> {
        Ok(Self::new(read_manifest(path, row_limit)?, transform))
    }

    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> VmmrResult<&ManifestRecord> {
        self.records
            .get(index)
            .ok_or(VmmrError::Index { index, len: self.records.len() })
    }
}

impl IndexedDataset for ImageDataset {
    type Item = ImageSample;

    fn length(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> VmmrResult<ImageSample> {
        let record = self.record(index)?;
        let path   = Path::new(&record.image_path);

        let image = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => VmmrError::fs(path, io),
            other                   => VmmrError::decode(path, other),
        })?;

        Ok(self.transform.run(image.to_rgb8(), record.label))
    }
}

impl Dataset<SampleResult> for ImageDataset {
    fn get(&self, index: usize) -> Option<SampleResult> {
        (index < self.records.len()).then(|| IndexedDataset::get(self, index))
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    /// Write `count` solid-colour PNGs per label under `root/<label>/`
    /// and return their manifest rows.
    pub(crate) fn write_fixture(
        root:   &Path,
        labels: &[&str],
        count:  usize,
        size:   u32,
        color:  [u8; 3],
    ) -> Vec<ManifestRecord> {
        let mut records = Vec::new();
        for (label, name) in labels.iter().enumerate() {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..count {
                let path = dir.join(format!("{i}.png"));
                RgbImage::from_pixel(size, size, Rgb(color)).save(&path).unwrap();
                records.push(ManifestRecord {
                    image_name: format!("{i}.png"),
                    image_path: path.to_string_lossy().into_owned(),
                    label_name: name.to_string(),
                    label,
                });
            }
        }
        records
    }

    #[test]
    fn test_length_equals_row_count() {
        let tmp     = tempfile::tempdir().unwrap();
        let records = write_fixture(tmp.path(), &["audi", "bmw"], 3, 8, [1, 2, 3]);
        let ds      = ImageDataset::new(records, Transform::new());
        assert_eq!(ds.length(), 6);
        assert_eq!(Dataset::len(&ds), 6);
    }

    #[test]
    fn test_get_in_range_succeeds() {
        let tmp     = tempfile::tempdir().unwrap();
        let records = write_fixture(tmp.path(), &["audi", "bmw"], 2, 8, [0, 128, 255]);
        let ds      = ImageDataset::new(records, Transform::new().resize(4, 4));

        for i in 0..ds.length() {
            let sample = IndexedDataset::get(&ds, i).unwrap();
            assert_eq!(sample.label, i / 2);
            assert_eq!(sample.pixels.len(), 3 * 4 * 4);
        }
    }

    #[test]
    fn test_get_out_of_range_is_index_error() {
        let tmp     = tempfile::tempdir().unwrap();
        let records = write_fixture(tmp.path(), &["audi"], 2, 4, [0, 0, 0]);
        let ds      = ImageDataset::new(records, Transform::new());

        for i in [2, 3, 100] {
            assert!(matches!(IndexedDataset::get(&ds, i), Err(VmmrError::Index { len: 2, .. })));
        }
        assert!(Dataset::get(&ds, 2).is_none());
    }

    #[test]
    fn test_non_image_is_decode_error() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, b"not an image").unwrap();

        let ds = ImageDataset::new(
            vec![ManifestRecord {
                image_name: "notes.txt".into(),
                image_path: path.to_string_lossy().into_owned(),
                label_name: "audi".into(),
                label:      0,
            }],
            Transform::new(),
        );
        assert!(matches!(IndexedDataset::get(&ds, 0), Err(VmmrError::Decode { .. })));
    }

    #[test]
    fn test_missing_file_is_filesystem_error() {
        let ds = ImageDataset::new(
            vec![ManifestRecord {
                image_name: "gone.png".into(),
                image_path: "/no/such/dir/gone.png".into(),
                label_name: "audi".into(),
                label:      0,
            }],
            Transform::new(),
        );
        assert!(matches!(IndexedDataset::get(&ds, 0), Err(VmmrError::FileSystem { .. })));
    }
}
