use super::metadata::{PixelMetadata, PixelMetadataTable};
use super::peak::PixelSpectrum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub name: String,
    pub spectra: Vec<PixelSpectrum>,
}

/// All pixels of one processing run, grouped by class.
///
/// Pixel order (classes in order, then spectra in order) is the row
/// order of every matrix built from the dataset; `pixel_id`s handed out
/// by the extractor are positions in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub classes: Vec<ClassGroup>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.classes.iter().map(|c| c.spectra.len()).sum()
    }

    pub fn num_peaks(&self) -> usize {
        self.pixels().map(|p| p.len()).sum()
    }

    pub fn pixels(&self) -> impl Iterator<Item = &PixelSpectrum> + '_ {
        self.classes.iter().flat_map(|c| c.spectra.iter())
    }

    pub fn pixel_labels(&self) -> Vec<String> {
        self.pixels().map(|p| p.pixel_label()).collect()
    }

    pub fn metadata_table(&self) -> PixelMetadataTable {
        let mut table = PixelMetadataTable::new(format!("{}.metadata", self.name), &self.name);
        table.rows = self
            .pixels()
            .map(|p| PixelMetadata {
                pixel_id: p.pixel_label(),
                dataset: self.name.clone(),
                class: p.class().to_string(),
                sample: p.sample().to_string(),
                scan: p.scan(),
                tic: p.tic(),
                num_peaks: p.len(),
            })
            .collect();
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_order_follows_classes() {
        let dataset = Dataset {
            name: "run1".into(),
            classes: vec![
                ClassGroup {
                    name: "a".into(),
                    spectra: vec![
                        PixelSpectrum::new("s1", 1, "a", vec![1.0], vec![1.0]).unwrap(),
                        PixelSpectrum::new("s1", 2, "a", vec![], vec![]).unwrap(),
                    ],
                },
                ClassGroup {
                    name: "b".into(),
                    spectra: vec![PixelSpectrum::new("s2", 1, "b", vec![2.0, 3.0], vec![1.0, 1.0])
                        .unwrap()],
                },
            ],
        };
        assert_eq!(dataset.num_pixels(), 3);
        assert_eq!(dataset.num_peaks(), 3);
        assert_eq!(dataset.pixel_labels(), vec!["s1.1", "s1.2", "s2.1"]);

        let table = dataset.metadata_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2].class, "b");
        assert_eq!(table.rows[2].tic, 2.0);
        assert_eq!(table.dataset, "run1");
    }
}
