//! Line-delimited JSON truth data loading
//!
//! Each line holds one page: `{"features": {...}, "label": ..., "book": ...,
//! "page": ...}`. Pages are kept in file order in parallel vectors.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{Result, TrainerError};

/// The only label treated as the positive class
pub const POSITIVE_LABEL: &str = "POETRY";

/// Map a raw label to the binary target: "POETRY" is 1, anything else 0.
pub fn label_to_y(label: Option<&str>) -> u8 {
    match label {
        Some(POSITIVE_LABEL) => 1,
        _ => 0,
    }
}

/// Book or page identifier.
///
/// Scalars that compare equal as numbers share one identifier: `1`,
/// `1.0` and `true` are all `Int(1)`. Integers order numerically and
/// before any text identifier. Fractional or out-of-range floats are
/// kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(match n.as_i64().or_else(|| n.as_f64().and_then(integral)) {
                Some(i) => RecordId::Int(i),
                None => RecordId::Text(n.to_string()),
            }),
            Value::String(s) => Some(RecordId::Text(s.clone())),
            Value::Bool(b) => Some(RecordId::Int(i64::from(*b))),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// `x` as an integer when it is whole and fits in `i64`
fn integral(x: f64) -> Option<i64> {
    // 2^63 is exact in f64; `i64::MAX as f64` rounds up to it.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x)).then(|| x as i64)
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

/// A single raw feature value
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

/// Sparse feature mapping of one page
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Loaded pages as parallel, equally long sequences
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub features: Vec<FeatureMap>,
    pub labels: Vec<u8>,
    pub books: Vec<RecordId>,
    pub pages: Vec<RecordId>,
}

impl Dataset {
    /// Load a newline-delimited JSON truth file
    pub fn from_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse records from any buffered reader; any malformed line aborts.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut dataset = Dataset::default();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let record: Value = serde_json::from_str(&line).map_err(|err| TrainerError::Parse {
                line: line_no,
                message: err.to_string(),
            })?;
            let record = record.as_object().ok_or_else(|| TrainerError::Parse {
                line: line_no,
                message: "record is not a JSON object".to_string(),
            })?;

            let features = match record.get("features") {
                Some(Value::Object(map)) => parse_features(map, line_no)?,
                Some(_) => {
                    return Err(TrainerError::Parse {
                        line: line_no,
                        message: "'features' is not an object".to_string(),
                    })
                }
                None => {
                    return Err(TrainerError::MissingField {
                        line: line_no,
                        field: "features",
                    })
                }
            };

            let label = label_to_y(record.get("label").and_then(Value::as_str));
            let book = parse_id(record, "book", line_no)?;
            let page = parse_id(record, "page", line_no)?;

            dataset.features.push(features);
            dataset.labels.push(label);
            dataset.books.push(book);
            dataset.pages.push(page);
        }

        if dataset.is_empty() {
            return Err(TrainerError::EmptyDataset);
        }

        Ok(dataset)
    }

    /// Get number of pages
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Page counts as `[negative, positive]`
    pub fn class_counts(&self) -> [usize; 2] {
        let positive = self.labels.iter().filter(|&&y| y == 1).count();
        [self.len() - positive, positive]
    }

    pub fn positive_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.class_counts()[1] as f64 / self.len() as f64
    }

    /// Group row indices by book
    pub fn book_index(&self) -> BookIndex {
        BookIndex::from_books(&self.books)
    }
}

fn parse_id(record: &Map<String, Value>, field: &'static str, line: usize) -> Result<RecordId> {
    let value = record
        .get(field)
        .ok_or(TrainerError::MissingField { line, field })?;
    RecordId::from_json(value).ok_or_else(|| TrainerError::Parse {
        line,
        message: format!("'{}' must be a scalar, got {}", field, value),
    })
}

fn parse_features(map: &Map<String, Value>, line: usize) -> Result<FeatureMap> {
    let mut features = FeatureMap::new();
    for (name, value) in map {
        let parsed = match value {
            Value::Null => continue,
            Value::Bool(b) => FeatureValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(x) => FeatureValue::Number(x),
                None => return Err(invalid(name, line, "number not representable as f64")),
            },
            Value::String(s) => FeatureValue::Text(s.clone()),
            Value::Array(items) => {
                let mut texts = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) => texts.push(s.to_string()),
                        None => return Err(invalid(name, line, "arrays may only hold strings")),
                    }
                }
                FeatureValue::TextList(texts)
            }
            Value::Object(_) => return Err(invalid(name, line, "nested objects are not supported")),
        };
        features.insert(name.clone(), parsed);
    }
    Ok(features)
}

fn invalid(name: &str, line: usize, message: &str) -> TrainerError {
    TrainerError::InvalidFeature {
        name: name.to_string(),
        message: format!("line {}: {}", line, message),
    }
}

/// Row indices of every book, keyed and iterated in sorted book order
#[derive(Clone, Debug, Default)]
pub struct BookIndex {
    rows: BTreeMap<RecordId, Vec<usize>>,
}

impl BookIndex {
    pub fn from_books(books: &[RecordId]) -> Self {
        let mut rows: BTreeMap<RecordId, Vec<usize>> = BTreeMap::new();
        for (i, book) in books.iter().enumerate() {
            rows.entry(book.clone()).or_default().push(i);
        }
        Self { rows }
    }

    /// Sorted, deduplicated book identifiers
    pub fn books(&self) -> Vec<RecordId> {
        self.rows.keys().cloned().collect()
    }

    pub fn rows_for(&self, book: &RecordId) -> &[usize] {
        self.rows.get(book).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct books
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
