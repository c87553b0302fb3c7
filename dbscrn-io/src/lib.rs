//! dbscrn-io: Dataset readers and run report writers.
//!
//! Datasets are read from TSV, ARFF or PA (`.txt` + `.pa`) files; a
//! finished run is written as `OUT.csv` (per-point result), `DEBUG.tsv`
//! (neighbor sets) and `STAT.json` (parameters, metrics, statistics,
//! timings).
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{parse_arff, parse_pa, parse_tsv, read_dataset, DatasetFormat, DatasetReader};
pub use writer::{
    run_directory, MainInfo, MetricsSection, ReportWriter, RunParameters, StatReport,
    StatsSection, DEBUG_FILE, OUT_FILE, STAT_FILE,
};
