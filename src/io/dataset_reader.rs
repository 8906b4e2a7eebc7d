use crate::errors::{DataReadingError, Result};
use crate::io::sample_reader::{read_sample, SampleFormat};
use crate::models::dataset::{ClassGroup, Dataset};
use crate::models::peak::PixelSpectrum;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub class: String,
    pub path: PathBuf,
}

impl SampleFile {
    /// The file stem, which prefixes every pixel id of the sample.
    pub fn sample_name(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Sample files found under a dataset root, sorted by class then path.
///
/// Every subdirectory of the root is a class, every supported file in it
/// is a sample. Loose files in the root are ignored.
#[derive(Debug, Clone)]
pub struct DatasetScan {
    pub root: PathBuf,
    pub name: String,
    pub files: Vec<SampleFile>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| DataReadingError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataReadingError::io(dir, e))?;
        out.push(entry.path());
    }
    out.sort();
    Ok(out)
}

impl DatasetScan {
    pub fn from_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(DataReadingError::MissingDirectory(root.to_path_buf()).into());
        }
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();

        let mut files = Vec::new();
        for class_dir in sorted_entries(root)? {
            if !class_dir.is_dir() || is_hidden(&class_dir) {
                debug!("Ignoring {} in dataset root", class_dir.display());
                continue;
            }
            let class = class_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            for path in sorted_entries(&class_dir)? {
                if path.is_file() && SampleFormat::from_path(&path).is_some() {
                    files.push(SampleFile {
                        class: class.clone(),
                        path,
                    });
                } else {
                    debug!("Ignoring {}", path.display());
                }
            }
        }
        info!(
            "Found {} sample files under {}",
            files.len(),
            root.display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            name,
            files,
        })
    }

    /// For every file, the earlier file with the same sample name, if any.
    ///
    /// Pixel ids are `sample.scan`, so only the first file of a name is
    /// read, whatever class directory or format the others are in.
    pub fn duplicate_samples(&self) -> Vec<Option<&Path>> {
        let mut first_by_name: HashMap<&str, &Path> = HashMap::new();
        let mut out = Vec::with_capacity(self.files.len());
        for f in self.files.iter() {
            let first = match f.sample_name() {
                Some(name) => match first_by_name.entry(name) {
                    Entry::Occupied(e) => Some(*e.get()),
                    Entry::Vacant(e) => {
                        e.insert(f.path.as_path());
                        None
                    }
                },
                None => None,
            };
            out.push(first);
        }
        out
    }

    /// Class names in scan order, including classes whose samples all failed.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for f in self.files.iter() {
            if names.last() != Some(&f.class) {
                names.push(f.class.clone());
            }
        }
        names
    }
}

/// A sample that could not be read; the rest of the dataset still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub failures: Vec<SampleFailure>,
}

/// Reads every sample of a scan in parallel.
///
/// With `fail_fast` the first failed sample (in scan order) aborts the
/// load, otherwise failures are logged and collected.
#[instrument(skip_all, fields(dataset = %scan.name))]
pub fn load_dataset(scan: &DatasetScan, fail_fast: bool) -> Result<LoadedDataset> {
    let duplicates = scan.duplicate_samples();
    let results: Vec<(&SampleFile, Result<Vec<PixelSpectrum>>)> = scan
        .files
        .par_iter()
        .zip(duplicates.par_iter())
        .progress_count(scan.files.len() as u64)
        .map(|(f, first)| match first {
            Some(first) => {
                let err = DataReadingError::DuplicateSample {
                    path: f.path.clone(),
                    first: first.to_path_buf(),
                };
                (f, Err(err.into()))
            }
            None => (f, read_sample(&f.path, &f.class)),
        })
        .collect();

    let mut classes: Vec<ClassGroup> = scan
        .class_names()
        .into_iter()
        .map(|name| ClassGroup {
            name,
            spectra: Vec::new(),
        })
        .collect();
    let mut failures = Vec::new();
    let mut class_idx = 0;
    for (file, result) in results {
        while classes[class_idx].name != file.class {
            class_idx += 1;
        }
        match result {
            Ok(spectra) => classes[class_idx].spectra.extend(spectra),
            Err(e) if fail_fast => return Err(e),
            Err(e) => {
                warn!("Skipping sample {}: {}", file.path.display(), e);
                failures.push(SampleFailure {
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let dataset = Dataset {
        name: scan.name.clone(),
        classes,
    };
    info!(
        "Loaded {} pixels / {} peaks in {} classes, {} samples failed",
        dataset.num_pixels(),
        dataset.num_peaks(),
        dataset.classes.len(),
        failures.len()
    );
    Ok(LoadedDataset { dataset, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tree(root: &Path) {
        fs::create_dir_all(root.join("tumor")).unwrap();
        fs::create_dir_all(root.join("healthy")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("tumor/b.csv"), "scan,mz,intensity\n1,100.0,1\n").unwrap();
        fs::write(root.join("tumor/a.csv"), "scan,mz,intensity\n1,100.0,2\n2,200.0,1\n").unwrap();
        fs::write(root.join("tumor/notes.md"), "ignored").unwrap();
        fs::write(root.join("healthy/c.csv"), "mz,intensity\n300.0,1\n").unwrap();
        fs::write(root.join("loose.csv"), "mz,intensity\n1.0,1\n").unwrap();
    }

    #[test]
    fn test_scan_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        let scan = DatasetScan::from_dir(dir.path()).unwrap();
        let names: Vec<_> = scan
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["c.csv", "a.csv", "b.csv"]);
        assert_eq!(scan.class_names(), vec!["healthy", "tumor"]);
    }

    #[test]
    fn test_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        let scan = DatasetScan::from_dir(dir.path()).unwrap();
        let loaded = load_dataset(&scan, false).unwrap();
        assert!(loaded.failures.is_empty());
        assert_eq!(
            loaded.dataset.pixel_labels(),
            vec!["c.0", "a.1", "a.2", "b.1"]
        );
    }

    #[test]
    fn test_failed_sample_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        fs::write(dir.path().join("tumor/bad.csv"), "mz,intensity\nabc,1\n").unwrap();
        let scan = DatasetScan::from_dir(dir.path()).unwrap();

        let loaded = load_dataset(&scan, false).unwrap();
        assert_eq!(loaded.failures.len(), 1);
        assert!(loaded.failures[0].path.ends_with("tumor/bad.csv"));
        assert_eq!(loaded.dataset.num_pixels(), 4);

        assert!(load_dataset(&scan, true).is_err());
    }

    #[test]
    fn test_repeated_sample_name_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        fs::write(dir.path().join("healthy/a.csv"), "mz,intensity\n400.0,1\n").unwrap();
        fs::write(dir.path().join("tumor/b.json"), r#"{"mz": [1.0], "intensity": [1.0]}"#).unwrap();
        let scan = DatasetScan::from_dir(dir.path()).unwrap();

        let loaded = load_dataset(&scan, false).unwrap();
        let failed: Vec<_> = loaded.failures.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            failed,
            vec![dir.path().join("tumor/a.csv"), dir.path().join("tumor/b.json")]
        );
        assert!(loaded.failures[0].reason.contains("healthy/a.csv"));
        assert_eq!(
            loaded.dataset.pixel_labels(),
            vec!["a.0", "c.0", "b.1"]
        );

        assert!(load_dataset(&scan, true).is_err());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DatasetScan::from_dir(&dir.path().join("nope")).is_err());
    }
}
