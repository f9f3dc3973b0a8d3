use std::path::{Path, PathBuf};
use std::str::FromStr;

use calamine::{Reader, open_workbook_auto};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Spreadsheet {0} has no worksheets")]
    EmptyWorkbook(PathBuf),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Invalid filter '{0}', expected COLUMN=VALUE")]
    InvalidFilter(String),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Keeps rows whose `column` cell equals `value` exactly
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl FromStr for RowFilter {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((column, value)) if !column.trim().is_empty() => Ok(Self {
                column: column.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(DatasetError::InvalidFilter(s.to_string())),
        }
    }
}

/// An in-memory table of string cells with a header row
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> DatasetResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RaggedRow {
                    row: i + 1,
                    found: row.len(),
                    expected: columns.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Load a CSV file or the first worksheet of a spreadsheet
    pub fn load(path: &Path) -> DatasetResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let dataset = match extension.as_str() {
            "csv" | "txt" => Self::from_csv_reader(std::fs::File::open(path)?)?,
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Self::from_spreadsheet(path)?,
            other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
        };

        info!(
            path = %path.display(),
            columns = dataset.columns.len(),
            rows = dataset.rows.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> DatasetResult<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let columns = rdr.headers()?.iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Self::new(columns, rows)
    }

    fn from_spreadsheet(path: &Path) -> DatasetResult<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DatasetError::EmptyWorkbook(path.to_path_buf()))??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let columns = rows.next().unwrap_or_default();
        let width = columns.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching every filter, columns unchanged
    pub fn filter(&self, filters: &[RowFilter]) -> DatasetResult<Dataset> {
        let indices = filters
            .iter()
            .map(|f| {
                self.columns
                    .iter()
                    .position(|c| c == &f.column)
                    .map(|i| (i, f.value.as_str()))
                    .ok_or_else(|| DatasetError::UnknownColumn(f.column.clone()))
            })
            .collect::<DatasetResult<Vec<_>>>()?;

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .filter(|row| indices.iter().all(|(i, value)| row[*i] == *value))
            .cloned()
            .collect();

        debug!(before = self.rows.len(), after = rows.len(), "Applied row filters");
        Ok(Dataset {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Serialize to CSV in memory: header row first, no index column
    pub fn to_csv(&self) -> DatasetResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))
    }
}

/// Source dataset plus the filters currently applied to it
#[derive(Clone, Debug)]
pub struct FilteredDataset {
    source: Dataset,
    filters: Vec<RowFilter>,
}

impl FilteredDataset {
    pub fn new(source: Dataset, filters: Vec<RowFilter>) -> Self {
        Self { source, filters }
    }

    /// The rows visible under the current filters
    pub fn current(&self) -> DatasetResult<Dataset> {
        if self.filters.is_empty() {
            return Ok(self.source.clone());
        }
        self.source.filter(&self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["city".into(), "sales".into()],
            vec![
                vec!["Oslo".into(), "10".into()],
                vec!["Lima".into(), "7".into()],
                vec!["Oslo".into(), "3".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_serialization_has_header_and_no_index() {
        let csv = String::from_utf8(sample().to_csv().unwrap()).unwrap();
        assert_eq!(csv, "city,sales\nOslo,10\nLima,7\nOslo,3\n");
    }

    #[test]
    fn test_csv_serialization_quotes_delimiters() {
        let data = Dataset::new(vec!["note".into()], vec![vec!["a, b".into()]]).unwrap();
        let csv = String::from_utf8(data.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "note\n\"a, b\"\n");
    }

    #[test]
    fn test_filter_keeps_matching_rows() {
        let filtered = sample()
            .filter(&["city=Oslo".parse().unwrap()])
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.columns(), sample().columns());
    }

    #[test]
    fn test_filter_on_unknown_column_fails() {
        let err = sample().filter(&["region=EU".parse().unwrap()]).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownColumn(c) if c == "region"));
    }

    #[test]
    fn test_filter_parsing() {
        let filter: RowFilter = "status=open=now".parse().unwrap();
        assert_eq!(filter.column, "status");
        assert_eq!(filter.value, "open=now");
        assert!("novalue".parse::<RowFilter>().is_err());
        assert!("=x".parse::<RowFilter>().is_err());
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = Dataset::new(vec!["a".into(), "b".into()], vec![vec!["1".into()]]).unwrap_err();
        assert!(matches!(err, DatasetError::RaggedRow { row: 1, found: 1, expected: 2 }));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "x,y\n1,2\n3,4\n").unwrap();

        let data = Dataset::load(&path).unwrap();
        assert_eq!(data.columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Dataset::load(Path::new("data.parquet")).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(ext) if ext == "parquet"));
    }

    #[test]
    fn test_filtered_dataset_applies_filters_each_time() {
        let view = FilteredDataset::new(sample(), vec!["city=Lima".parse().unwrap()]);
        assert_eq!(view.current().unwrap().len(), 1);
        assert_eq!(view.current().unwrap().len(), 1);
    }
}
