use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Bookkeeping for one pixel, one row of `pixel_metadata.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelMetadata {
    pub pixel_id: String,
    pub dataset: String,
    pub class: String,
    pub sample: String,
    pub scan: u32,
    pub tic: f64,
    pub num_peaks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelMetadataTable {
    /// Where the table came from, usually its file path.
    pub source: String,
    pub dataset: String,
    pub rows: Vec<PixelMetadata>,
}

impl PixelMetadataTable {
    pub fn new(source: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dataset: dataset.into(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The directory holding the source file, which is the run directory
    /// for tables read from disk. Falls back to the file stem when the
    /// source has no parent.
    pub fn source_name(&self) -> &str {
        let path = Path::new(&self.source);
        path.parent()
            .and_then(|p| p.file_name())
            .or_else(|| path.file_stem())
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }

    pub fn index_by_pixel(&self) -> HashMap<&str, &PixelMetadata> {
        self.rows
            .iter()
            .map(|row| (row.pixel_id.as_str(), row))
            .collect()
    }
}
