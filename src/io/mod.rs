pub mod background;
pub mod checkpoint;
pub mod dataset_reader;
pub mod matrix_io;
pub mod sample_reader;

use crate::errors::{DataReadingError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| DataReadingError::json(path, e))?;
    std::fs::write(path, text).map_err(|e| DataReadingError::io(path, e))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| DataReadingError::io(path, e))?;
    let value = serde_json::from_str(&text).map_err(|e| DataReadingError::json(path, e))?;
    Ok(value)
}
