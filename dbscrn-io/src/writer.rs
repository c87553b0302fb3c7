//! Run report writers: `OUT.csv`, `DEBUG.tsv` and `STAT.json`.

use crate::Result;
use dbscrn_algorithms::{AlgorithmParams, ClusteringAlgorithm, QualityReport};
use dbscrn_core::{ClusteringOutcome, Dataset, Neighborhoods, SearchBounds};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output file names inside a run directory.
pub const OUT_FILE: &str = "OUT.csv";
/// Per-point neighbor diagnostics.
pub const DEBUG_FILE: &str = "DEBUG.tsv";
/// Run summary.
pub const STAT_FILE: &str = "STAT.json";

/// Directory for one run: `<base>/<algorithm>/<dataset>/<parameters>`.
#[must_use]
pub fn run_directory(
    base: &Path,
    algorithm: ClusteringAlgorithm,
    dataset_name: &str,
    params: &AlgorithmParams,
) -> PathBuf {
    let leaf = match algorithm {
        ClusteringAlgorithm::Dbscan => format!(
            "min_samples_{}_eps_{}_m_{}",
            params.min_points, params.epsilon, params.minkowski_power
        ),
        ClusteringAlgorithm::DbscanRn | ClusteringAlgorithm::DbscanRnTi => {
            format!("k_{}_m_{}", params.k, params.minkowski_power)
        }
    };
    base.join(algorithm.as_str()).join(dataset_name).join(leaf)
}

fn join_ids<'a>(dataset: &Dataset, indices: impl IntoIterator<Item = &'a usize>) -> String {
    let ids: Vec<String> = indices
        .into_iter()
        .map(|&index| dataset.point(index).id.to_string())
        .collect();
    format!("[{}]", ids.join(", "))
}

fn bound(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the report files of one run into a directory.
pub struct ReportWriter {
    directory: PathBuf,
}

impl ReportWriter {
    /// Creates the directory (and parents) if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// The run directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn open(&self, name: &str) -> Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(self.directory.join(name))?))
    }

    /// Writes `OUT.csv`: `point_id,x_0..x_{d-1},#_calcs,point_type,c_id`.
    ///
    /// `point_type` is 1 core, 0 border, -1 noise; `c_id` is the cluster id
    /// or -1 for noise.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_out_csv(&self, dataset: &Dataset, outcome: &ClusteringOutcome) -> Result<()> {
        let mut writer = self.open(OUT_FILE)?;

        let dims: Vec<String> = (0..dataset.dimensions()).map(|i| format!("x_{i}")).collect();
        writeln!(writer, "point_id,{},#_calcs,point_type,c_id", dims.join(","))?;

        for (index, point) in dataset.iter().enumerate() {
            let coords: Vec<String> = point.coords.iter().map(f64::to_string).collect();
            let point_type = outcome.point_types[index]
                .as_raw()
                .map_or_else(String::new, |t| t.to_string());
            writeln!(
                writer,
                "{},{},{},{},{}",
                point.id,
                coords.join(","),
                outcome.distance_calculations[index],
                point_type,
                outcome.assignments[index].as_raw()
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Writes `DEBUG.tsv` with the neighbor sets behind each decision.
    ///
    /// DBSCAN: `id, eps_neighbours, |eps_neighbours|`. DBSCANRN:
    /// `id, k+NN, rk+NN, |rk+NN|`, plus `min_eps, max_eps` for the
    /// triangle-inequality search.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_debug_tsv(&self, dataset: &Dataset, outcome: &ClusteringOutcome) -> Result<()> {
        let mut writer = self.open(DEBUG_FILE)?;

        match &outcome.neighborhoods {
            Neighborhoods::Eps(eps) => {
                writeln!(writer, "id\teps_neighbours\t|eps_neighbours|")?;
                for (index, point) in dataset.iter().enumerate() {
                    let neighbors = eps.of(index);
                    writeln!(
                        writer,
                        "{}\t{}\t{}",
                        point.id,
                        join_ids(dataset, neighbors),
                        neighbors.len()
                    )?;
                }
            }
            Neighborhoods::Knn(knn) => {
                let bounds = knn.bounds.as_deref();
                if bounds.is_some() {
                    writeln!(writer, "id\tk+NN\trk+NN\t|rk+NN|\tmin_eps\tmax_eps")?;
                } else {
                    writeln!(writer, "id\tk+NN\trk+NN\t|rk+NN|")?;
                }
                for (index, point) in dataset.iter().enumerate() {
                    let forward = knn.forward_indices(index);
                    let reverse = knn.reverse_of(index);
                    write!(
                        writer,
                        "{}\t{}\t{}\t{}",
                        point.id,
                        join_ids(dataset, &forward),
                        join_ids(dataset, reverse),
                        reverse.len()
                    )?;
                    if let Some(bounds) = bounds {
                        let SearchBounds { min_eps, max_eps } = bounds[index];
                        write!(writer, "\t{}\t{}", bound(min_eps), bound(max_eps))?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Writes `STAT.json`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or serialized.
    pub fn write_stat_json(&self, report: &StatReport) -> Result<()> {
        let mut writer = self.open(STAT_FILE)?;
        serde_json::to_writer_pretty(&mut writer, report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// `main` section of `STAT.json`.
#[derive(Debug, Clone, Serialize)]
pub struct MainInfo {
    /// Point dimensionality.
    #[serde(rename = "#_dimensions")]
    pub dimensions: usize,
    /// Number of points.
    #[serde(rename = "#_points")]
    pub points: usize,
    /// Path of the dataset file.
    pub input_file: String,
    /// Algorithm name.
    pub algorithm: String,
}

/// `parameters` section of `STAT.json`; only the fields the algorithm uses.
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    /// DBSCAN density threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_samples: Option<usize>,
    /// DBSCAN radius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    /// DBSCANRN neighborhood size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    /// Whether the triangle-inequality search was used.
    #[serde(rename = "TI_optimized", skip_serializing_if = "Option::is_none")]
    pub ti_optimized: Option<bool>,
    /// Resolved reference point of the triangle-inequality search.
    #[serde(rename = "TI_reference_point", skip_serializing_if = "Option::is_none")]
    pub ti_reference_point: Option<Vec<f64>>,
    /// Minkowski power.
    pub minkowski_power: f64,
}

/// `clustering_metrics` section of `STAT.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSection {
    /// Purity.
    #[serde(rename = "Purity", skip_serializing_if = "Option::is_none")]
    pub purity: Option<f64>,
    /// Davies-Bouldin index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub davies_bouldin: Option<f64>,
    /// RAND index.
    #[serde(rename = "RAND", skip_serializing_if = "Option::is_none")]
    pub rand: Option<f64>,
    /// Same cluster, same ground truth.
    #[serde(rename = "TP", skip_serializing_if = "Option::is_none")]
    pub true_positives: Option<u64>,
    /// Different cluster, different ground truth.
    #[serde(rename = "TN", skip_serializing_if = "Option::is_none")]
    pub true_negatives: Option<u64>,
    /// Number of unordered pairs.
    #[serde(rename = "#_of_pairs", skip_serializing_if = "Option::is_none")]
    pub pairs: Option<u64>,
    /// Silhouette coefficient.
    #[serde(rename = "silhouette_coefficient", skip_serializing_if = "Option::is_none")]
    pub silhouette: Option<f64>,
}

impl From<&QualityReport> for MetricsSection {
    fn from(report: &QualityReport) -> Self {
        Self {
            purity: report.purity,
            davies_bouldin: report.davies_bouldin,
            rand: report.rand.map(|r| r.value),
            true_positives: report.rand.map(|r| r.true_positives),
            true_negatives: report.rand.map(|r| r.true_negatives),
            pairs: report.rand.map(|r| r.pairs),
            silhouette: report.silhouette,
        }
    }
}

/// `clustering_stats` section of `STAT.json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSection {
    /// Clusters found.
    #[serde(rename = "#_clusters")]
    pub clusters: usize,
    /// Core points.
    #[serde(rename = "#_core_points")]
    pub core_points: usize,
    /// Border points.
    #[serde(rename = "#_border_points")]
    pub border_points: usize,
    /// Noise points.
    #[serde(rename = "#_noise_points")]
    pub noise_points: usize,
    /// Mean distance evaluations per point.
    #[serde(rename = "avg_#_of_distance_calculation")]
    pub avg_distance_calculations: f64,
}

/// Content of `STAT.json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatReport {
    /// Dataset and algorithm.
    pub main: MainInfo,
    /// Parameters used.
    pub parameters: RunParameters,
    /// Quality metrics.
    pub clustering_metrics: MetricsSection,
    /// Counts.
    pub clustering_stats: StatsSection,
    /// Phase durations in seconds, keys numbered in execution order.
    pub clustering_time: BTreeMap<String, f64>,
}

impl StatReport {
    /// Assembles the report of a finished run.
    ///
    /// `extra_phases` are timed outside the clustering run (file reading,
    /// metric computation) and are listed around the run's own phases:
    /// those named `read_input_file` first, the rest after.
    ///
    /// # Errors
    /// Returns an error if the triangle-inequality reference cannot be
    /// resolved for `dataset`.
    pub fn new(
        input_file: &Path,
        dataset: &Dataset,
        algorithm: ClusteringAlgorithm,
        params: &AlgorithmParams,
        outcome: &ClusteringOutcome,
        quality: &QualityReport,
        extra_phases: &[(&str, Duration)],
    ) -> Result<Self> {
        let parameters = match algorithm {
            ClusteringAlgorithm::Dbscan => RunParameters {
                min_samples: Some(params.min_points),
                eps: Some(params.epsilon),
                k: None,
                ti_optimized: None,
                ti_reference_point: None,
                minkowski_power: params.minkowski_power,
            },
            ClusteringAlgorithm::DbscanRn | ClusteringAlgorithm::DbscanRnTi => {
                let ti = algorithm == ClusteringAlgorithm::DbscanRnTi;
                RunParameters {
                    min_samples: None,
                    eps: None,
                    k: Some(params.k),
                    ti_optimized: Some(ti),
                    ti_reference_point: if ti {
                        Some(params.reference.resolve(dataset)?)
                    } else {
                        None
                    },
                    minkowski_power: params.minkowski_power,
                }
            }
        };

        let statistics = outcome.statistics();
        let (before, after): (Vec<_>, Vec<_>) = extra_phases
            .iter()
            .partition(|(name, _)| *name == "read_input_file");
        let phases: Vec<(&str, Duration)> = before
            .into_iter()
            .copied()
            .chain(outcome.timings.iter())
            .chain(after.into_iter().copied())
            .collect();
        let mut clustering_time: BTreeMap<String, f64> = phases
            .iter()
            .enumerate()
            .map(|(i, (name, elapsed))| (format!("{}_{name}", i + 1), elapsed.as_secs_f64()))
            .collect();
        let total: Duration = phases.iter().map(|(_, d)| *d).sum();
        clustering_time.insert("total_runtime".to_string(), total.as_secs_f64());

        Ok(Self {
            main: MainInfo {
                dimensions: dataset.dimensions(),
                points: dataset.len(),
                input_file: input_file.display().to_string(),
                algorithm: algorithm.as_str().to_string(),
            },
            parameters,
            clustering_metrics: MetricsSection::from(quality),
            clustering_stats: StatsSection {
                clusters: statistics.clusters,
                core_points: statistics.core_points,
                border_points: statistics.border_points,
                noise_points: statistics.noise_points,
                avg_distance_calculations: statistics.avg_distance_calculations,
            },
            clustering_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbscrn_algorithms::{run_clustering, RandIndex};
    use dbscrn_core::Point;
    use tempfile::TempDir;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Point::new("a", vec![0.0, 0.0]).with_label(1_i64),
            Point::new("b", vec![0.0, 1.0]).with_label(1_i64),
            Point::new("c", vec![10.0, 0.0]).with_label(2_i64),
        ])
        .unwrap()
    }

    fn params() -> AlgorithmParams {
        AlgorithmParams {
            epsilon: 2.0,
            min_points: 2,
            k: 2,
            ..AlgorithmParams::default()
        }
    }

    #[test]
    fn test_run_directory() {
        let params = params();
        let dir = run_directory(Path::new("out"), ClusteringAlgorithm::Dbscan, "toy", &params);
        assert_eq!(dir, Path::new("out/dbscan/toy/min_samples_2_eps_2_m_2"));
        let dir = run_directory(Path::new("out"), ClusteringAlgorithm::DbscanRnTi, "toy", &params);
        assert_eq!(dir, Path::new("out/dbscanrn_ti/toy/k_2_m_2"));
    }

    #[test]
    fn test_join_ids() {
        let dataset = dataset();
        assert_eq!(join_ids(&dataset, &Vec::<usize>::new()), "[]");
        assert_eq!(join_ids(&dataset, &[2, 0]), "[c, a]");
    }

    #[test]
    fn test_write_out_csv() {
        let tmp = TempDir::new().unwrap();
        let dataset = dataset();
        let outcome = run_clustering(&dataset, ClusteringAlgorithm::Dbscan, &params()).unwrap();
        let writer = ReportWriter::create(tmp.path().join("run")).unwrap();
        writer.write_out_csv(&dataset, &outcome).unwrap();

        let content = fs::read_to_string(tmp.path().join("run").join(OUT_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "point_id,x_0,x_1,#_calcs,point_type,c_id");
        assert_eq!(lines[1], "a,0,0,2,1,1");
        assert_eq!(lines[3], "c,10,0,2,-1,-1");
    }

    #[test]
    fn test_write_debug_tsv_knn() {
        let tmp = TempDir::new().unwrap();
        let dataset = dataset();
        let outcome = run_clustering(&dataset, ClusteringAlgorithm::DbscanRnTi, &params()).unwrap();
        let writer = ReportWriter::create(tmp.path()).unwrap();
        writer.write_debug_tsv(&dataset, &outcome).unwrap();

        let content = fs::read_to_string(tmp.path().join(DEBUG_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id\tk+NN\trk+NN\t|rk+NN|\tmin_eps\tmax_eps");
        // a and b pick each other; c picks a, nobody picks c.
        assert!(lines[1].starts_with("a\t[b]\t[b, c]\t2\t"));
        assert!(lines[2].starts_with("b\t[a]\t[a]\t1\t"));
        assert!(lines[3].starts_with("c\t[a]\t[]\t0\t"));
    }

    #[test]
    fn test_write_debug_tsv_eps() {
        let tmp = TempDir::new().unwrap();
        let dataset = dataset();
        let outcome = run_clustering(&dataset, ClusteringAlgorithm::Dbscan, &params()).unwrap();
        let writer = ReportWriter::create(tmp.path()).unwrap();
        writer.write_debug_tsv(&dataset, &outcome).unwrap();

        let content = fs::read_to_string(tmp.path().join(DEBUG_FILE)).unwrap();
        assert_eq!(
            content,
            "id\teps_neighbours\t|eps_neighbours|\na\t[b]\t1\nb\t[a]\t1\nc\t[]\t0\n"
        );
    }

    #[test]
    fn test_write_stat_json() {
        let tmp = TempDir::new().unwrap();
        let dataset = dataset();
        let params = params();
        let outcome = run_clustering(&dataset, ClusteringAlgorithm::DbscanRnTi, &params).unwrap();
        let quality = QualityReport {
            purity: Some(1.0),
            rand: Some(RandIndex {
                value: 1.0,
                true_positives: 1,
                true_negatives: 2,
                pairs: 3,
            }),
            silhouette: None,
            davies_bouldin: Some(0.25),
        };
        let report = StatReport::new(
            Path::new("toy.tsv"),
            &dataset,
            ClusteringAlgorithm::DbscanRnTi,
            &params,
            &outcome,
            &quality,
            &[
                ("read_input_file", Duration::from_millis(5)),
                ("stats_calculation", Duration::from_millis(1)),
            ],
        )
        .unwrap();
        let writer = ReportWriter::create(tmp.path()).unwrap();
        writer.write_stat_json(&report).unwrap();

        let text = fs::read_to_string(tmp.path().join(STAT_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["main"]["#_points"], 3);
        assert_eq!(json["main"]["algorithm"], "dbscanrn_ti");
        assert_eq!(json["parameters"]["k"], 2);
        assert_eq!(json["parameters"]["TI_optimized"], true);
        assert_eq!(json["parameters"]["TI_reference_point"][1], 0.0);
        assert!(json["parameters"].get("eps").is_none());
        assert_eq!(json["clustering_metrics"]["TP"], 1);
        assert_eq!(json["clustering_metrics"]["TN"], 2);
        assert!(json["clustering_metrics"].get("silhouette_coefficient").is_none());
        assert!(json["clustering_time"]["1_read_input_file"].is_number());
        assert!(json["clustering_time"]["2_reference_distances"].is_number());
        assert!(json["clustering_time"]["total_runtime"].is_number());
    }
}
