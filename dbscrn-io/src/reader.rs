//! Dataset readers.
//!
//! Three line-oriented formats are understood:
//! - **TSV**: `id<TAB>v1<TAB>..<TAB>vn<TAB>label`, one point per line. A
//!   first line whose values are not numeric is taken as a header.
//! - **ARFF**: everything after `@data` is `v1,..,vn,class`; ids are row
//!   indices. Header and data are case-folded, `%` starts a comment.
//! - **PA**: a `<name>.txt` file of space-separated coordinates and a
//!   `<name>.pa` file with one class per line, after an optional header that
//!   ends with a dashed separator line. Ids are row indices.

use crate::{Error, Result};
use dbscrn_core::{Dataset, Identifier, Point};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Supported dataset file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetFormat {
    /// Tab-separated: id, coordinates, label.
    Tsv,
    /// Weka ARFF with the class in the last column.
    Arff,
    /// Paired `.txt` coordinates and `.pa` classes.
    Pa,
}

impl DatasetFormat {
    /// Detects the format from the file extension.
    ///
    /// # Errors
    /// [`Error::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("tsv") => Ok(Self::Tsv),
            Some("arff") => Ok(Self::Arff),
            Some("txt" | "pa") => Ok(Self::Pa),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Reads a dataset file whose format is chosen by extension.
pub struct DatasetReader {
    path: PathBuf,
    format: DatasetFormat,
}

impl DatasetReader {
    /// Prepares to read `path`.
    ///
    /// # Errors
    /// Returns an error if the extension is not recognised.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = DatasetFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// The detected format.
    #[must_use]
    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// The file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dataset name: the file stem.
    #[must_use]
    pub fn dataset_name(&self) -> String {
        self.path
            .file_stem()
            .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned())
    }

    /// Reads and validates the whole dataset.
    ///
    /// # Errors
    /// I/O and parse errors, plus dataset validation errors (empty file,
    /// inconsistent dimensionality, duplicate ids).
    pub fn read(&self) -> Result<Dataset> {
        let dataset = match self.format {
            DatasetFormat::Tsv => parse_tsv(open(&self.path)?)?,
            DatasetFormat::Arff => parse_arff(open(&self.path)?)?,
            DatasetFormat::Pa => parse_pa(
                open(&self.path.with_extension("txt"))?,
                open(&self.path.with_extension("pa"))?,
            )?,
        };
        debug!(
            "read {} points of dimension {} from {}",
            dataset.len(),
            dataset.dimensions(),
            self.path.display()
        );
        Ok(dataset)
    }
}

/// Reads the dataset at `path`, detecting the format by extension.
///
/// # Errors
/// See [`DatasetReader::open`] and [`DatasetReader::read`].
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    DatasetReader::open(path)?.read()
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn parse_value(token: &str, line: usize) -> Result<f64> {
    let token = token.trim();
    token
        .parse::<f64>()
        .map_err(|_| Error::parse(line, format!("'{token}' is not a number")))
}

/// Parses TSV rows: `id`, coordinates, then the ground-truth label.
///
/// # Errors
/// [`Error::Parse`] for rows with fewer than three fields or non-numeric
/// coordinates; NaN and infinite values are rejected by [`Dataset::new`].
pub fn parse_tsv<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut points = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 3 {
            return Err(Error::parse(
                number,
                format!("expected id, coordinates and label, found {} fields", fields.len()),
            ));
        }
        let values = &fields[1..fields.len() - 1];
        if points.is_empty() && values.iter().any(|v| v.trim().parse::<f64>().is_err()) {
            debug!("skipping TSV header: {trimmed}");
            continue;
        }
        let coords = values
            .iter()
            .map(|v| parse_value(v, number))
            .collect::<Result<Vec<_>>>()?;
        let label = Identifier::parse(fields[fields.len() - 1]);
        points.push(Point::new(Identifier::parse(fields[0]), coords).with_label(label));
    }
    Ok(Dataset::new(points)?)
}

/// Parses an ARFF file: the `@data` section, class label in the last column.
///
/// # Errors
/// [`Error::Parse`] if there is no `@data` marker or a value is not numeric.
pub fn parse_arff<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut points = Vec::new();
    let mut in_data = false;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let trimmed = line.trim().to_ascii_lowercase();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if !in_data {
            in_data = trimmed == "@data";
            continue;
        }
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let (class, values) = match fields.split_last() {
            Some((class, values)) if !values.is_empty() => (class, values),
            _ => return Err(Error::parse(number, "expected coordinates and a class")),
        };
        let coords = values
            .iter()
            .map(|v| parse_value(v, number))
            .collect::<Result<Vec<_>>>()?;
        points.push(Point::new(points.len(), coords).with_label(Identifier::parse(class)));
    }
    if !in_data {
        return Err(Error::parse(0, "no @data section"));
    }
    Ok(Dataset::new(points)?)
}

/// Parses a PA pair: coordinate rows from `coords`, class labels from
/// `classes`.
///
/// Everything up to and including the first `classes` line containing `-`
/// is header. If there is no such line the whole file is labels.
///
/// # Errors
/// [`Error::Parse`] for non-numeric coordinates or when the number of labels
/// differs from the number of coordinate rows.
pub fn parse_pa<C: BufRead, L: BufRead>(coords: C, classes: L) -> Result<Dataset> {
    let mut rows = Vec::new();
    for (index, line) in coords.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|v| parse_value(v, number))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    let lines = classes.lines().collect::<std::io::Result<Vec<_>>>()?;
    let start = lines
        .iter()
        .position(|line| line.contains('-'))
        .map_or(0, |separator| separator + 1);
    let labels: Vec<&str> = lines[start..]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    if labels.len() != rows.len() {
        return Err(Error::parse(
            start,
            format!(
                "{} coordinate rows but {} class labels",
                rows.len(),
                labels.len()
            ),
        ));
    }

    let points = rows
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (row, label))| Point::new(index, row).with_label(Identifier::parse(label)))
        .collect();
    Ok(Dataset::new(points)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DatasetFormat::from_path(Path::new("a/b/set.TSV")).unwrap(),
            DatasetFormat::Tsv
        );
        assert_eq!(
            DatasetFormat::from_path(Path::new("iris.arff")).unwrap(),
            DatasetFormat::Arff
        );
        assert_eq!(
            DatasetFormat::from_path(Path::new("s1.txt")).unwrap(),
            DatasetFormat::Pa
        );
        assert_eq!(
            DatasetFormat::from_path(Path::new("s1.pa")).unwrap(),
            DatasetFormat::Pa
        );
        assert!(matches!(
            DatasetFormat::from_path(Path::new("points.csv")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_tsv_with_header() {
        let input = "name\tx\ty\tclass\np1\t0.5\t1\tA\np2\t2\t-3.25\t7\n\n";
        let dataset = parse_tsv(Cursor::new(input)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dimensions(), 2);
        assert_eq!(dataset.point(0).id, Identifier::from("p1"));
        assert_eq!(dataset.coords(1), &[2.0, -3.25]);
        assert_eq!(dataset.point(1).label, Some(Identifier::Int(7)));
    }

    #[test]
    fn test_parse_tsv_errors() {
        let err = parse_tsv(Cursor::new("1\t0\t0\ta\n2\tx\t0\ta\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        let err = parse_tsv(Cursor::new("1\t0\ta\n2\t0\t1\ta\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(dbscrn_core::Error::InvalidDimension { .. })
        ));

        let err = parse_tsv(Cursor::new("1\t0\t0\ta\n2\tNaN\t1\ta\n3\t1\tinf\ta\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(dbscrn_core::Error::NonFiniteCoordinate { dimension: 0, .. })
        ));

        let err = parse_tsv(Cursor::new("1\t0\ta\n1\t1\ta\n")).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(dbscrn_core::Error::DuplicatePointId(_))
        ));
    }

    #[test]
    fn test_parse_arff() {
        let input = "% comment\n@RELATION toy\n@ATTRIBUTE x NUMERIC\n@ATTRIBUTE y NUMERIC\n\
                     @ATTRIBUTE class {A,B}\n@DATA\n1.0, 2.0, A\n3,4,B\n";
        let dataset = parse_arff(Cursor::new(input)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.point(0).id, Identifier::Int(0));
        assert_eq!(dataset.point(1).id, Identifier::Int(1));
        assert_eq!(dataset.coords(0), &[1.0, 2.0]);
        assert_eq!(dataset.point(0).label, Some(Identifier::from("a")));
    }

    #[test]
    fn test_parse_pa() {
        let coords = "  664159 550946\n665845  557965\n\n597173 575538\n";
        let classes = "Ground truth labels\n-------------------\n1\n1\n2\n";
        let dataset = parse_pa(Cursor::new(coords), Cursor::new(classes)).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.coords(1), &[665_845.0, 557_965.0]);
        assert_eq!(dataset.point(2).id, Identifier::Int(2));
        assert_eq!(dataset.point(2).label, Some(Identifier::Int(2)));
    }

    #[test]
    fn test_parse_pa_without_header() {
        let dataset = parse_pa(Cursor::new("0 0\n1 1\n"), Cursor::new("a\nb\n")).unwrap();
        assert_eq!(dataset.point(1).label, Some(Identifier::from("b")));
    }

    #[test]
    fn test_parse_pa_label_count_mismatch() {
        let err = parse_pa(Cursor::new("0 0\n1 1\n"), Cursor::new("---\n1\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_parse_arff_without_data() {
        let err = parse_arff(Cursor::new("@relation x\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
