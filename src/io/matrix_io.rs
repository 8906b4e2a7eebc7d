use crate::errors::{DataReadingError, Result};
use crate::models::aligned_matrix::AlignedMatrix;
use crate::models::compiled_matrix::CompiledMatrix;
use crate::models::metadata::{PixelMetadata, PixelMetadataTable};
use std::path::Path;
use tracing::debug;

pub const ALIGNED_MATRIX_FILE: &str = "aligned_matrix.csv";
pub const PIXEL_METADATA_FILE: &str = "pixel_metadata.csv";
pub const COMPILED_MATRIX_FILE: &str = "compiled_matrix.csv";

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| DataReadingError::csv(path, e).into())
}

/// Writes `pixel_id,<mass>...` followed by one row per pixel.
///
/// Masses are written with `{}` so they read back to the same `f64`.
pub fn write_aligned_matrix(path: &Path, matrix: &AlignedMatrix) -> Result<()> {
    let mut wtr = writer(path)?;
    let header = std::iter::once("pixel_id".to_string())
        .chain(matrix.mass_labels().iter().map(|m| m.to_string()));
    wtr.write_record(header)
        .map_err(|e| DataReadingError::csv(path, e))?;
    for (row, pixel_id) in matrix.pixel_ids().iter().enumerate() {
        let record = std::iter::once(pixel_id.clone())
            .chain(matrix.row(row).iter().map(|v| v.to_string()));
        wtr.write_record(record)
            .map_err(|e| DataReadingError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataReadingError::io(path, e))?;
    debug!("Wrote {} to {}", matrix, path.display());
    Ok(())
}

pub fn read_aligned_matrix(path: &Path) -> Result<AlignedMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DataReadingError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| DataReadingError::csv(path, e))?
        .clone();
    let mass_labels = headers
        .iter()
        .skip(1)
        .map(|h| {
            h.trim()
                .parse::<f64>()
                .map_err(|_| DataReadingError::invalid_value(path, 1, h))
        })
        .collect::<std::result::Result<Vec<f64>, _>>()?;

    let mut pixel_ids = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataReadingError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let mut fields = record.iter();
        let pixel_id = fields
            .next()
            .ok_or_else(|| DataReadingError::invalid_value(path, line, "empty row"))?;
        pixel_ids.push(pixel_id.to_string());
        for field in fields {
            let v = field
                .trim()
                .parse::<f64>()
                .map_err(|_| DataReadingError::invalid_value(path, line, field))?;
            values.push(v);
        }
    }
    AlignedMatrix::new(mass_labels, pixel_ids, values)
}

pub fn write_metadata(path: &Path, table: &PixelMetadataTable) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record([
        "pixel_id",
        "dataset",
        "class",
        "sample",
        "scan",
        "tic",
        "num_peaks",
    ])
    .map_err(|e| DataReadingError::csv(path, e))?;
    for row in table.rows.iter() {
        wtr.serialize(row)
            .map_err(|e| DataReadingError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataReadingError::io(path, e))?;
    Ok(())
}

/// Reads a metadata table; its source is the file path so name based
/// matching can look at the run directory holding it.
pub fn read_metadata(path: &Path) -> Result<PixelMetadataTable> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataReadingError::csv(path, e))?;
    let rows = reader
        .deserialize::<PixelMetadata>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DataReadingError::csv(path, e))?;
    let dataset = match rows.first() {
        Some(row) => row.dataset.clone(),
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string(),
    };
    let mut table = PixelMetadataTable::new(path.display().to_string(), dataset);
    table.rows = rows;
    Ok(table)
}

pub fn write_compiled_matrix(path: &Path, matrix: &CompiledMatrix) -> Result<()> {
    let mut wtr = writer(path)?;
    let header = ["pixel_id", "tissue", "class", "sample"]
        .into_iter()
        .map(str::to_string)
        .chain(matrix.columns.iter().map(|c| c.label.clone()));
    wtr.write_record(header)
        .map_err(|e| DataReadingError::csv(path, e))?;
    for row in 0..matrix.n_rows() {
        let prov = &matrix.provenance[row];
        let record = [
            matrix.pixel_ids[row].clone(),
            prov.tissue.clone(),
            prov.class.clone(),
            prov.sample.clone(),
        ]
        .into_iter()
        .chain(matrix.row(row).iter().map(|v| v.to_string()));
        wtr.write_record(record)
            .map_err(|e| DataReadingError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| DataReadingError::io(path, e))?;
    Ok(())
}
