//! Tabular prediction payload (JSON).
//!
//! Two equivalent shapes are recognized, matching what model-serving backends
//! accept on their invocation endpoint:
//! - `{"dataframe_split": {"columns": [...], "data": [[...], ...]}}`
//! - `{"dataframe_records": [{"col": value, ...}, ...]}`
//!
//! An optional `params` object may ride along with either shape. The parsed
//! value is only used for validation; the proxy forwards the original bytes.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ModelWatchError, Result};

/// Column-oriented split form.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataframeSplit {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Ordered rows; each row holds one cell per column.
    pub data: Vec<Vec<Value>>,
    /// Optional row index labels.
    #[serde(default)]
    pub index: Option<Vec<Value>>,
}

/// Recognized tabular shapes.
#[derive(Debug, Clone)]
pub enum Tabular {
    Split(DataframeSplit),
    Records(Vec<Map<String, Value>>),
}

/// Validated `/predict` body.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub table: Tabular,
    pub params: Option<Map<String, Value>>,
}

impl PredictRequest {
    /// Number of rows the backend will be asked to score.
    pub fn rows(&self) -> usize {
        match &self.table {
            Tabular::Split(s) => s.data.len(),
            Tabular::Records(r) => r.len(),
        }
    }

    /// Short label for logs.
    pub fn shape(&self) -> &'static str {
        match &self.table {
            Tabular::Split(_) => "dataframe_split",
            Tabular::Records(_) => "dataframe_records",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Wire {
    #[serde(default)]
    dataframe_split: Option<DataframeSplit>,
    #[serde(default)]
    dataframe_records: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

/// Parse and validate a `/predict` body.
pub fn parse_predict_request(body: &[u8]) -> Result<PredictRequest> {
    let wire: Wire = serde_json::from_slice(body)
        .map_err(|e| ModelWatchError::BadInput(format!("invalid payload json: {e}")))?;

    let table = match (wire.dataframe_split, wire.dataframe_records) {
        (Some(split), None) => {
            validate_split(&split)?;
            Tabular::Split(split)
        }
        (None, Some(records)) => {
            validate_records(&records)?;
            Tabular::Records(records)
        }
        (Some(_), Some(_)) => {
            return Err(ModelWatchError::BadInput(
                "only one of dataframe_split or dataframe_records may be given".into(),
            ))
        }
        (None, None) => {
            return Err(ModelWatchError::BadInput(
                "payload must contain dataframe_split or dataframe_records".into(),
            ))
        }
    };

    Ok(PredictRequest {
        table,
        params: wire.params,
    })
}

fn validate_split(split: &DataframeSplit) -> Result<()> {
    if split.columns.is_empty() {
        return Err(ModelWatchError::BadInput("dataframe_split.columns must not be empty".into()));
    }
    if split.columns.iter().any(|c| c.is_empty()) {
        return Err(ModelWatchError::BadInput("column names must not be empty".into()));
    }
    if split.data.is_empty() {
        return Err(ModelWatchError::BadInput("dataframe_split.data must not be empty".into()));
    }

    let width = split.columns.len();
    if let Some((i, row)) = split.data.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(ModelWatchError::BadInput(format!(
            "row {i} has {} cells, expected {width}",
            row.len()
        )));
    }

    if let Some(index) = &split.index {
        if index.len() != split.data.len() {
            return Err(ModelWatchError::BadInput(format!(
                "index has {} labels for {} rows",
                index.len(),
                split.data.len()
            )));
        }
    }
    Ok(())
}

fn validate_records(records: &[Map<String, Value>]) -> Result<()> {
    if records.is_empty() {
        return Err(ModelWatchError::BadInput("dataframe_records must not be empty".into()));
    }
    if let Some(i) = records.iter().position(|r| r.is_empty()) {
        return Err(ModelWatchError::BadInput(format!("record {i} has no fields")));
    }
    Ok(())
}
