use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLabel {
    pub label: String,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub tissue: String,
    pub class: String,
    pub sample: String,
}

/// Union-aligned matrix over several runs, row-major.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledMatrix {
    pub columns: Vec<ColumnLabel>,
    pub pixel_ids: Vec<String>,
    pub provenance: Vec<Provenance>,
    pub values: Vec<f64>,
}

impl CompiledMatrix {
    pub fn n_rows(&self) -> usize {
        self.pixel_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }
}
