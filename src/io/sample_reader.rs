use crate::errors::{DataReadingError, Result};
use crate::models::peak::PixelSpectrum;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

const MASS_COLUMNS: [&str; 3] = ["mz", "m/z", "mass"];
const INTENSITY_COLUMNS: [&str; 3] = ["intensity", "int", "i"];
const SCAN_COLUMNS: [&str; 3] = ["scan", "scan_number", "pixel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Csv,
    Tsv,
    Json,
}

impl SampleFormat {
    /// Format of a sample file, `None` for hidden files and unknown extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with('.') {
            return None;
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "txt" => Some(Self::Tsv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Pixels of one sample grouped by scan number, in ascending scan order.
#[derive(Debug, Default)]
struct ScanGroups {
    scans: BTreeMap<u32, (Vec<f64>, Vec<f64>)>,
}

impl ScanGroups {
    fn push(&mut self, scan: u32, mz: f64, intensity: f64) {
        let entry = self.scans.entry(scan).or_default();
        entry.0.push(mz);
        entry.1.push(intensity);
    }

    fn into_spectra(self, sample: &str, class: &str) -> Result<Vec<PixelSpectrum>> {
        self.scans
            .into_iter()
            .map(|(scan, (mz, intensity))| PixelSpectrum::new(sample, scan, class, mz, intensity))
            .collect()
    }
}

/// Reads every pixel of one sample file.
///
/// The sample name is the file stem; `class` is the name of the directory
/// holding the file.
pub fn read_sample(path: &Path, class: &str) -> Result<Vec<PixelSpectrum>> {
    let sample = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DataReadingError::UnsupportedFormat(path.to_path_buf()))?;
    let groups = match SampleFormat::from_path(path) {
        Some(SampleFormat::Csv) => read_table(path, b',')?,
        Some(SampleFormat::Tsv) => read_table(path, b'\t')?,
        Some(SampleFormat::Json) => read_json(path)?,
        None => return Err(DataReadingError::UnsupportedFormat(path.to_path_buf()).into()),
    };
    let spectra = groups.into_spectra(sample, class)?;
    trace!("Read {} pixels from {}", spectra.len(), path.display());
    Ok(spectra)
}

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
}

fn parse_value(path: &Path, line: u64, raw: Option<&str>) -> Result<f64> {
    let raw = raw.unwrap_or("").trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DataReadingError::invalid_value(path, line, raw).into()),
    }
}

fn read_table(path: &Path, delimiter: u8) -> Result<ScanGroups> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DataReadingError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| DataReadingError::csv(path, e))?
        .clone();
    let mz_col = find_column(&headers, &MASS_COLUMNS).ok_or(DataReadingError::MissingColumn {
        path: path.to_path_buf(),
        column: "mz",
    })?;
    let int_col =
        find_column(&headers, &INTENSITY_COLUMNS).ok_or(DataReadingError::MissingColumn {
            path: path.to_path_buf(),
            column: "intensity",
        })?;
    let scan_col = find_column(&headers, &SCAN_COLUMNS);

    let mut groups = ScanGroups::default();
    for record in reader.records() {
        let record = record.map_err(|e| DataReadingError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let mz = parse_value(path, line, record.get(mz_col))?;
        let intensity = parse_value(path, line, record.get(int_col))?;
        let scan = match scan_col {
            Some(col) => {
                let raw = record.get(col).unwrap_or("").trim();
                raw.parse::<u32>()
                    .map_err(|_| DataReadingError::invalid_value(path, line, raw))?
            }
            None => 0,
        };
        groups.push(scan, mz, intensity);
    }
    Ok(groups)
}

#[derive(Debug, Deserialize)]
struct JsonPixel {
    scan: u32,
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

fn read_json(path: &Path) -> Result<ScanGroups> {
    let text = std::fs::read_to_string(path).map_err(|e| DataReadingError::io(path, e))?;
    let pixels: Vec<JsonPixel> =
        serde_json::from_str(&text).map_err(|e| DataReadingError::json(path, e))?;

    let mut groups = ScanGroups::default();
    for (i, pixel) in pixels.into_iter().enumerate() {
        // Record position stands in for a line number.
        let record = i as u64 + 1;
        if pixel.mz.len() != pixel.intensity.len() {
            return Err(DataReadingError::invalid_value(
                path,
                record,
                format!(
                    "{} masses but {} intensities",
                    pixel.mz.len(),
                    pixel.intensity.len()
                ),
            )
            .into());
        }
        for (mz, intensity) in pixel.mz.into_iter().zip(pixel.intensity) {
            for v in [mz, intensity] {
                if !v.is_finite() || v < 0.0 {
                    return Err(DataReadingError::invalid_value(path, record, v).into());
                }
            }
            groups.push(pixel.scan, mz, intensity);
        }
    }
    Ok(groups)
}
