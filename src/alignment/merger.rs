use crate::models::aligned_matrix::AlignedMatrix;
use crate::models::compiled_matrix::{ColumnLabel, CompiledMatrix, Provenance};
use crate::models::metadata::PixelMetadataTable;
use crate::traits::metadata_matcher::{unique_or_not, MetadataMatch, MetadataMatcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// One independently aligned matrix and the name it was produced under.
#[derive(Debug, Clone)]
pub struct DatasetRun {
    pub name: String,
    pub matrix: AlignedMatrix,
}

/// Pairs a run with the metadata table whose dataset id equals the run name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactIdMatcher;

impl MetadataMatcher for ExactIdMatcher {
    fn find_metadata<'a>(
        &self,
        run_name: &str,
        candidates: &'a [PixelMetadataTable],
    ) -> MetadataMatch<'a> {
        unique_or_not(candidates.iter().filter(|t| t.dataset == run_name))
    }
}

/// Pairs a run with the metadata table whose run directory name contains
/// the run name. Kept for outputs written before dataset ids were recorded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameContainsMatcher;

impl MetadataMatcher for NameContainsMatcher {
    fn find_metadata<'a>(
        &self,
        run_name: &str,
        candidates: &'a [PixelMetadataTable],
    ) -> MetadataMatch<'a> {
        unique_or_not(candidates.iter().filter(|t| t.source_name().contains(run_name)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRun {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub merged: Vec<String>,
    pub skipped: Vec<SkippedRun>,
    pub columns: usize,
    pub rows: usize,
}

pub struct Merger {
    matcher: Box<dyn MetadataMatcher>,
    label_decimals: usize,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(Box::new(ExactIdMatcher), 4)
    }
}

struct AcceptedRun<'a> {
    run: &'a DatasetRun,
    metadata: &'a PixelMetadataTable,
}

/// Column labels shared by every merged run.
///
/// A label is the mass rounded to `decimals`. An identical mass always maps
/// to the same column; a different mass that rounds onto a taken label is
/// another cluster and gets the next free `_1`, `_2`, ... suffix.
struct LabelTable {
    decimals: usize,
    by_base: HashMap<String, Vec<f64>>,
    columns: Vec<ColumnLabel>,
}

impl LabelTable {
    fn new(decimals: usize) -> Self {
        Self {
            decimals,
            by_base: HashMap::new(),
            columns: Vec::new(),
        }
    }

    fn label_of(&mut self, source: &str, mass: f64) -> String {
        let base = format!("{:.*}", self.decimals, mass);
        let masses = self.by_base.entry(base.clone()).or_default();
        if let Some(k) = masses.iter().position(|&m| m == mass) {
            return suffixed(base, k);
        }
        masses.push(mass);
        let k = masses.len() - 1;
        let label = suffixed(base, k);
        if k > 0 {
            warn!(
                "Run {}: mass {} rounds onto a label of another cluster, using {}",
                source, mass, label
            );
        }
        self.columns.push(ColumnLabel {
            label: label.clone(),
            mass,
        });
        label
    }
}

fn suffixed(base: String, k: usize) -> String {
    if k == 0 {
        base
    } else {
        format!("{}_{}", base, k)
    }
}

impl Merger {
    pub fn new(matcher: Box<dyn MetadataMatcher>, label_decimals: usize) -> Self {
        Self {
            matcher,
            label_decimals,
        }
    }

    fn accept<'a>(
        &self,
        run: &'a DatasetRun,
        metadata: &'a [PixelMetadataTable],
    ) -> Result<AcceptedRun<'a>, String> {
        let table = match self.matcher.find_metadata(&run.name, metadata) {
            MetadataMatch::Unique(table) => table,
            MetadataMatch::NotFound => {
                return Err("no matching metadata table (0 candidates)".to_string())
            }
            MetadataMatch::Ambiguous(n) => {
                return Err(format!("ambiguous metadata, {} candidate tables", n))
            }
        };
        let index = table.index_by_pixel();
        let missing = run
            .matrix
            .pixel_ids()
            .iter()
            .filter(|id| !index.contains_key(id.as_str()))
            .count();
        if missing > 0 {
            return Err(format!(
                "{} of {} rows are missing from metadata table {}",
                missing,
                run.matrix.n_rows(),
                table.source
            ));
        }
        Ok(AcceptedRun {
            run,
            metadata: table,
        })
    }

    /// Unions the columns of every run by label and stacks their rows.
    ///
    /// Runs are labelled in input order, so suffixes go to the later run.
    #[instrument(skip_all, fields(runs = runs.len()))]
    pub fn merge(
        &self,
        runs: &[DatasetRun],
        metadata: &[PixelMetadataTable],
    ) -> (CompiledMatrix, MergeReport) {
        let mut report = MergeReport::default();
        let mut accepted = Vec::with_capacity(runs.len());
        for run in runs {
            match self.accept(run, metadata) {
                Ok(a) => {
                    report.merged.push(run.name.clone());
                    accepted.push(a);
                }
                Err(reason) => {
                    warn!("Skipping run {}: {}", run.name, reason);
                    report.skipped.push(SkippedRun {
                        name: run.name.clone(),
                        reason,
                    });
                }
            }
        }

        let mut table = LabelTable::new(self.label_decimals);
        let run_labels: Vec<Vec<String>> = accepted
            .iter()
            .map(|a| {
                a.run
                    .matrix
                    .mass_labels()
                    .iter()
                    .map(|&mass| table.label_of(&a.run.name, mass))
                    .collect()
            })
            .collect();
        let mut columns = table.columns;
        columns.sort_by(|a, b| a.mass.total_cmp(&b.mass).then_with(|| a.label.cmp(&b.label)));
        let position: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.label.as_str(), i))
            .collect();

        let n_cols = columns.len();
        let n_rows: usize = accepted.iter().map(|a| a.run.matrix.n_rows()).sum();
        let mut compiled = CompiledMatrix {
            columns: Vec::new(),
            pixel_ids: Vec::with_capacity(n_rows),
            provenance: Vec::with_capacity(n_rows),
            values: vec![0.0; n_rows * n_cols],
        };

        let mut out_row = 0;
        for (a, labels) in accepted.iter().zip(run_labels.iter()) {
            let targets: Vec<usize> = labels.iter().map(|l| position[l.as_str()]).collect();
            let index = a.metadata.index_by_pixel();
            for (row, pixel_id) in a.run.matrix.pixel_ids().iter().enumerate() {
                let dest = &mut compiled.values[out_row * n_cols..(out_row + 1) * n_cols];
                for (value, target) in a.run.matrix.row(row).iter().zip(targets.iter()) {
                    dest[*target] = *value;
                }
                let meta = index[pixel_id.as_str()];
                compiled.pixel_ids.push(pixel_id.clone());
                compiled.provenance.push(Provenance {
                    tissue: a.run.name.clone(),
                    class: meta.class.clone(),
                    sample: meta.sample.clone(),
                });
                out_row += 1;
            }
        }
        compiled.columns = columns;

        report.columns = n_cols;
        report.rows = n_rows;
        info!(
            "Merged {} runs ({} skipped) into {} rows x {} columns",
            report.merged.len(),
            report.skipped.len(),
            n_rows,
            n_cols
        );
        (compiled, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metadata::PixelMetadata;

    fn run(name: &str, masses: Vec<f64>, ids: &[&str], values: Vec<f64>) -> DatasetRun {
        DatasetRun {
            name: name.to_string(),
            matrix: AlignedMatrix::new(
                masses,
                ids.iter().map(|s| s.to_string()).collect(),
                values,
            )
            .unwrap(),
        }
    }

    fn table(dataset: &str, ids: &[&str]) -> PixelMetadataTable {
        let mut t = PixelMetadataTable::new(format!("{}.metadata", dataset), dataset);
        for id in ids {
            let (sample, scan) = id.split_once('.').unwrap();
            t.rows.push(PixelMetadata {
                pixel_id: id.to_string(),
                dataset: dataset.to_string(),
                class: "tumor".to_string(),
                sample: sample.to_string(),
                scan: scan.parse().unwrap(),
                tic: 1.0,
                num_peaks: 1,
            });
        }
        t
    }

    #[test]
    fn test_identical_labels_keep_column_count() {
        let runs = vec![
            run("a", vec![100.0, 200.0], &["s1.1", "s1.2"], vec![1., 2., 3., 4.]),
            run("b", vec![100.0, 200.0], &["s2.1"], vec![5., 6.]),
        ];
        let tables = vec![table("a", &["s1.1", "s1.2"]), table("b", &["s2.1"])];
        let (compiled, report) = Merger::default().merge(&runs, &tables);
        assert_eq!(compiled.n_cols(), 2);
        assert_eq!(compiled.n_rows(), 3);
        assert_eq!(compiled.row(2), &[5., 6.]);
        assert_eq!(compiled.provenance[2].tissue, "b");
        assert_eq!(compiled.provenance[2].sample, "s2");
        assert_eq!(report.merged, vec!["a", "b"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_union_zero_fills_missing_columns() {
        let runs = vec![
            run("a", vec![100.0, 300.0], &["s1.1"], vec![1., 3.]),
            run("b", vec![200.0, 300.0], &["s2.1"], vec![2., 4.]),
        ];
        let tables = vec![table("a", &["s1.1"]), table("b", &["s2.1"])];
        let (compiled, _) = Merger::default().merge(&runs, &tables);
        assert_eq!(labels(&compiled), vec!["100.0000", "200.0000", "300.0000"]);
        assert_eq!(compiled.row(0), &[1., 0., 3.]);
        assert_eq!(compiled.row(1), &[0., 2., 4.]);
    }

    fn labels(compiled: &CompiledMatrix) -> Vec<&str> {
        compiled.columns.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_rounded_collisions_get_suffixes() {
        let runs = vec![run("a", vec![100.001, 100.002, 100.5], &["s1.1"], vec![1., 2., 3.])];
        let tables = vec![table("a", &["s1.1"])];
        let merger = Merger::new(Box::new(ExactIdMatcher), 2);
        let (compiled, _) = merger.merge(&runs, &tables);
        assert_eq!(labels(&compiled), vec!["100.00", "100.00_1", "100.50"]);
        assert_eq!(compiled.row(0), &[1., 2., 3.]);
    }

    #[test]
    fn test_cross_run_collision_keeps_both_clusters() {
        let runs = vec![
            run("a", vec![100.00004], &["s1.1"], vec![1.]),
            run("b", vec![100.00001], &["s2.1"], vec![2.]),
        ];
        let tables = vec![table("a", &["s1.1"]), table("b", &["s2.1"])];
        let (compiled, report) = Merger::default().merge(&runs, &tables);
        assert_eq!(report.columns, 2);
        // Ordered by mass, so run b's lighter cluster comes first.
        assert_eq!(labels(&compiled), vec!["100.0000_1", "100.0000"]);
        assert_eq!(compiled.columns[0].mass, 100.00001);
        assert_eq!(compiled.columns[1].mass, 100.00004);
        assert_eq!(compiled.row(0), &[0., 1.]);
        assert_eq!(compiled.row(1), &[2., 0.]);
    }

    #[test]
    fn test_same_mass_in_several_runs_shares_a_suffixed_column() {
        let runs = vec![
            run("a", vec![100.00004], &["s1.1"], vec![1.]),
            run("b", vec![100.00001], &["s2.1"], vec![2.]),
            run("c", vec![100.00001, 100.00004], &["s3.1"], vec![3., 4.]),
        ];
        let tables = vec![
            table("a", &["s1.1"]),
            table("b", &["s2.1"]),
            table("c", &["s3.1"]),
        ];
        let (compiled, _) = Merger::default().merge(&runs, &tables);
        assert_eq!(compiled.n_cols(), 2);
        assert_eq!(compiled.row(2), &[3., 4.]);
    }

    #[test]
    fn test_unmatched_and_ambiguous_runs_are_skipped() {
        let runs = vec![
            run("a", vec![100.0], &["s1.1"], vec![1.]),
            run("missing", vec![100.0], &["s9.1"], vec![1.]),
            run("dup", vec![100.0], &["s3.1"], vec![1.]),
        ];
        let tables = vec![
            table("a", &["s1.1"]),
            table("dup", &["s3.1"]),
            table("dup", &["s3.1"]),
        ];
        let (compiled, report) = Merger::default().merge(&runs, &tables);
        assert_eq!(compiled.n_rows(), 1);
        assert_eq!(report.merged, vec!["a"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].name, "missing");
        assert!(report.skipped[1].reason.contains("2 candidate"));
    }

    #[test]
    fn test_rows_missing_from_metadata_skip_the_run() {
        let runs = vec![run("a", vec![100.0], &["s1.1", "s1.2"], vec![1., 2.])];
        let tables = vec![table("a", &["s1.1"])];
        let (compiled, report) = Merger::default().merge(&runs, &tables);
        assert_eq!(compiled.n_rows(), 0);
        assert_eq!(compiled.n_cols(), 0);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_name_contains_matcher() {
        let tables = vec![table("a", &["s1.1"])];
        let matcher = NameContainsMatcher;
        assert!(matches!(
            matcher.find_metadata("b", &tables),
            MetadataMatch::NotFound
        ));
        assert!(matches!(
            matcher.find_metadata("a", &tables),
            MetadataMatch::Unique(_)
        ));
    }

    #[test]
    fn test_name_matcher_ignores_the_shared_file_name() {
        let tables = vec![
            PixelMetadataTable::new("/out/run1/pixel_metadata.csv", "run1"),
            PixelMetadataTable::new("/out/data/pixel_metadata.csv", "data"),
        ];
        let matcher = NameContainsMatcher;
        match matcher.find_metadata("data", &tables) {
            MetadataMatch::Unique(t) => assert_eq!(t.dataset, "data"),
            other => panic!("expected a unique match, got {:?}", other),
        }
        assert!(matches!(
            matcher.find_metadata("pixel", &tables),
            MetadataMatch::NotFound
        ));
        assert!(matches!(
            matcher.find_metadata("out", &tables),
            MetadataMatch::NotFound
        ));
        assert!(matches!(
            matcher.find_metadata("run", &tables),
            MetadataMatch::Unique(_)
        ));
    }
}
