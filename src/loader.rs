//! Reading collections from two-column `name, weight` data.
//!
//! Malformed rows never abort a load: they are skipped, logged and reported
//! back as [`SkippedRow`]s so the caller can show them. Only I/O failures are
//! errors.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::model::{Collection, ValidationError};

/// Error while reading collection data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read collection data: {0}")]
    Read(#[from] std::io::Error),
}

/// Options for parsing delimited collection data.
#[derive(Clone, Copy, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
        }
    }
}

impl CsvOptions {
    /// Sets the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the first row is a header.
    pub fn has_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

/// A row that was left out of the collection.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SkippedRow {
    /// 1-based line number (or row index for structured input)
    pub line: u64,
    pub reason: String,
}

/// Result of loading one collection.
#[derive(Clone, Debug, Default)]
pub struct LoadedCollection {
    pub collection: Collection,
    pub skipped: Vec<SkippedRow>,
}

impl LoadedCollection {
    /// Adds one raw row, recording it as skipped when it does not parse.
    pub fn push_row(&mut self, line: u64, name: Option<&str>, raw_weight: Option<&str>) {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            self.skip(line, "missing item name".to_string());
            return;
        };
        let Some(raw_weight) = raw_weight else {
            self.skip(line, format!("missing weight for '{name}'"));
            return;
        };
        let Some(weight) = parse_weight(raw_weight) else {
            self.skip(
                line,
                format!("unparsable weight '{}' for '{name}'", raw_weight.trim()),
            );
            return;
        };
        self.push_weight(line, name, weight);
    }

    /// Adds an already numeric weight, recording validation failures as skipped.
    pub fn push_weight(&mut self, line: u64, name: &str, weight: f64) {
        if let Err(err) = self.collection.insert(name, weight) {
            let reason = match err {
                ValidationError::EmptyName => "missing item name".to_string(),
                other => other.to_string(),
            };
            self.skip(line, reason);
        }
    }

    /// Records a skipped row.
    pub fn skip(&mut self, line: u64, reason: String) {
        warn!(line, %reason, "skipping collection row");
        self.skipped.push(SkippedRow { line, reason });
    }
}

/// Parses a weight value.
///
/// Accepts surrounding whitespace and a decimal comma when no dot is
/// present. Rejects negative, NaN and infinite values.
///
/// # Examples
/// ```
/// use split_it_now::loader::parse_weight;
///
/// assert_eq!(parse_weight(" 2.5 "), Some(2.5));
/// assert_eq!(parse_weight("2,5"), Some(2.5));
/// assert_eq!(parse_weight("-1"), None);
/// assert_eq!(parse_weight("abc"), None);
/// ```
pub fn parse_weight(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|value| *value >= 0.0)
}

/// Parses a user-supplied slack value.
///
/// Absent or blank input is 0, unparsable input is `None`. Unlike weights,
/// slack may be negative.
pub fn parse_slack(raw: Option<&str>) -> Option<f64> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_number(raw),
        None => Some(0.0),
    }
}

/// Finite number with an optional single decimal comma.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Reads a collection from delimited text.
///
/// The first column is the item name, the second its weight; further
/// columns are ignored. Rows with the same name are summed.
pub fn read_collection<R: Read>(
    reader: R,
    options: &CsvOptions,
) -> Result<LoadedCollection, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LoadedCollection::default();
    let mut record = csv::StringRecord::new();

    loop {
        match csv_reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let line = record.position().map_or(0, |pos| pos.line());
                loaded.push_row(line, record.get(0), record.get(1));
            }
            Err(err) if err.is_io_error() => {
                return Err(LoadError::Read(std::io::Error::from(err)));
            }
            Err(err) => {
                let line = err.position().map_or(0, |pos| pos.line());
                loaded.skip(line, format!("malformed row: {err}"));
            }
        }
    }

    Ok(loaded)
}

/// Reads a collection from a file on disk.
pub fn read_collection_from_path(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<LoadedCollection, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_collection(file, options)
}
