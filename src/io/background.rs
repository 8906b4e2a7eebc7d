use crate::errors::{DataReadingError, Result};
use std::path::Path;
use tracing::info;

/// Reads a background mass list, one mass per line.
///
/// Blank lines are skipped. The first non-blank line may be a header;
/// any other line that is not a finite mass is an error.
pub fn read_background(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| DataReadingError::io(path, e))?;
    let mut masses = Vec::new();
    let mut seen_first = false;
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<f64>() {
            Ok(mass) if mass.is_finite() => masses.push(mass),
            _ if !seen_first => {}
            _ => return Err(DataReadingError::invalid_value(path, i as u64 + 1, line).into()),
        }
        seen_first = true;
    }
    info!(
        "Read {} background masses from {}",
        masses.len(),
        path.display()
    );
    Ok(masses)
}
