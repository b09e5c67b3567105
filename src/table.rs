use crate::error::{ApAnalyticsError, Result};
use crate::schema::columns;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A spreadsheet cell before any interpretation.
///
/// Typed fields are only derived from these after a row passes validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// Null, whitespace-only text and NaN all count as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Float(value) => value.is_nan(),
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        RawValue::DateTime(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => n.as_f64().map(RawValue::Float).unwrap_or(RawValue::Null),
            },
            serde_json::Value::String(s) => RawValue::Text(s),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// An untrusted, rectangular table of raw cells with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn push_row(&mut self, row: Vec<RawValue>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(ApAnalyticsError::RaggedRow {
                row: self.rows.len(),
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Reads a header-plus-rows CSV. Empty cells become `RawValue::Null`, everything else is
    /// kept as text. A malformed file (e.g. rows of unequal width) is a fatal error.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut table = RawTable::new(headers.iter());

        for record in csv_reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        RawValue::Null
                    } else {
                        RawValue::Text(cell.to_string())
                    }
                })
                .collect();
            table.push_row(row)?;
        }

        Ok(table)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Reads a JSON array of flat objects. Columns are the union of all keys; a key missing
    /// from one record reads as `Null` in that row. An empty array yields a zero-row table
    /// with the required invoice columns.
    pub fn from_json_records(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ApAnalyticsError::FatalInput(format!("invalid JSON: {}", e)))?;

        let records = match value {
            serde_json::Value::Array(records) => records,
            other => {
                return Err(ApAnalyticsError::FatalInput(format!(
                    "expected an array of records, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut objects = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            match record {
                serde_json::Value::Object(map) => objects.push(map),
                other => {
                    return Err(ApAnalyticsError::FatalInput(format!(
                        "record #{} is {}, expected an object",
                        idx,
                        json_kind(&other)
                    )))
                }
            }
        }

        let mut headers: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }

        if objects.is_empty() {
            headers = columns::REQUIRED.iter().map(|c| c.to_string()).collect();
        }

        let mut table = RawTable::new(&headers);
        for mut object in objects {
            let row = headers
                .iter()
                .map(|h| object.remove(h).map(RawValue::from).unwrap_or(RawValue::Null))
                .collect();
            table.push_row(row)?;
        }

        Ok(table)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
