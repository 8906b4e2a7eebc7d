use crate::config::AlignmentConfig;
use crate::errors::{DataReadingError, Result};
use crate::io::dataset_reader::DatasetScan;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStage {
    Dataset,
    AlignedMatrix,
}

impl CheckpointStage {
    pub fn file_name(&self) -> &'static str {
        match self {
            CheckpointStage::Dataset => "dataset.msgpack",
            CheckpointStage::AlignedMatrix => "aligned_matrix.msgpack",
        }
    }
}

/// Content addressed store of intermediate results.
///
/// The key covers the configuration, the background list and every
/// sample file (relative path and bytes), so a changed input never
/// reuses a stale stage.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    key: String,
}

fn hash_file(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| DataReadingError::io(path, e))?;
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
    Ok(())
}

pub fn content_key(config: &AlignmentConfig, scan: &DatasetScan) -> Result<String> {
    let mut hasher = Sha256::new();
    let config_json = serde_json::to_string(config)
        .map_err(|e| DataReadingError::json(Path::new("<config>"), e))?;
    hasher.update(config_json.as_bytes());
    if let Some(background) = &config.background_file {
        hash_file(&mut hasher, background)?;
    }

    let mut files: Vec<(String, &Path)> = scan
        .files
        .iter()
        .map(|f| {
            let rel = f.path.strip_prefix(&scan.root).unwrap_or(&f.path);
            (rel.to_string_lossy().into_owned(), f.path.as_path())
        })
        .collect();
    files.sort();
    for (rel, path) in files {
        hasher.update(b"\0");
        hasher.update(rel.as_bytes());
        hasher.update(b"\0");
        hash_file(&mut hasher, path)?;
    }
    Ok(format!("{:x}", hasher.finalize()))
}

impl CheckpointStore {
    pub fn new(root: &Path, config: &AlignmentConfig, scan: &DatasetScan) -> Result<Self> {
        let key = content_key(config, scan)?;
        let dir = root.join(&key);
        info!("Checkpoints for this run live in {}", dir.display());
        Ok(Self { dir, key })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn stage_path(&self, stage: CheckpointStage) -> PathBuf {
        self.dir.join(stage.file_name())
    }

    /// Loads a stage. A missing stage is `Ok(None)`; an unreadable one
    /// is logged and treated as missing so it gets recomputed.
    pub fn load<T: DeserializeOwned>(&self, stage: CheckpointStage) -> Result<Option<T>> {
        let path = self.stage_path(stage);
        if !path.is_file() {
            debug!("No checkpoint at {}", path.display());
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| DataReadingError::io(&path, e))?;
        match rmp_serde::from_slice(&bytes) {
            Ok(value) => {
                info!("Reusing checkpoint {}", path.display());
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Ignoring unreadable checkpoint {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn store<T: Serialize>(&self, stage: CheckpointStage, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DataReadingError::io(&self.dir, e))?;
        let path = self.stage_path(stage);
        let bytes = rmp_serde::to_vec(value).map_err(|e| DataReadingError::Checkpoint {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, bytes).map_err(|e| DataReadingError::io(&path, e))?;
        debug!("Wrote checkpoint {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::aligned_matrix::AlignedMatrix;
    use std::fs;

    fn scan_with(dir: &Path, content: &str) -> DatasetScan {
        fs::create_dir_all(dir.join("c")).unwrap();
        fs::write(dir.join("c/s.csv"), content).unwrap();
        DatasetScan::from_dir(dir).unwrap()
    }

    #[test]
    fn test_key_tracks_inputs_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = AlignmentConfig::default();
        let scan = scan_with(dir.path(), "mz,intensity\n100,1\n");
        let k1 = content_key(&config, &scan).unwrap();
        assert_eq!(k1, content_key(&config, &scan).unwrap());
        assert_eq!(k1.len(), 64);

        let mut other = config.clone();
        other.clust_h = 0.02;
        assert_ne!(k1, content_key(&other, &scan).unwrap());

        let scan = scan_with(dir.path(), "mz,intensity\n100,2\n");
        assert_ne!(k1, content_key(&config, &scan).unwrap());
    }

    #[test]
    fn test_store_and_load_stage() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        let config = AlignmentConfig::default();
        let scan = scan_with(data.path(), "mz,intensity\n100,1\n");
        let store = CheckpointStore::new(ckpt.path(), &config, &scan).unwrap();

        let missing: Option<AlignedMatrix> = store.load(CheckpointStage::AlignedMatrix).unwrap();
        assert!(missing.is_none());

        let matrix = AlignedMatrix::new(vec![100.0], vec!["s.0".into()], vec![1.0]).unwrap();
        store.store(CheckpointStage::AlignedMatrix, &matrix).unwrap();
        let back: Option<AlignedMatrix> = store.load(CheckpointStage::AlignedMatrix).unwrap();
        assert_eq!(back, Some(matrix));
    }

    #[test]
    fn test_corrupt_stage_is_a_miss() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        let config = AlignmentConfig::default();
        let scan = scan_with(data.path(), "mz,intensity\n100,1\n");
        let store = CheckpointStore::new(ckpt.path(), &config, &scan).unwrap();
        fs::create_dir_all(store.stage_path(CheckpointStage::Dataset).parent().unwrap()).unwrap();
        fs::write(store.stage_path(CheckpointStage::Dataset), b"not msgpack").unwrap();
        let out: Option<AlignedMatrix> = store.load(CheckpointStage::Dataset).unwrap();
        assert!(out.is_none());
    }
}
