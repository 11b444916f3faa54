// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Flat tabular model for fetched records, lookup-field unwrapping, record normalization and CSV I/O
// role: data/table
// inputs: RawRecord sequences from listing endpoints; CSV files from report exports
// outputs: Table (ordered rows, first-seen column order); CSV files
// side_effects: read_csv/write_csv touch the filesystem
// invariants:
// - Row order is source order; columns are listed in first-seen order
// - A row may lack any column; absence is not an empty string
// - Normalization never unwraps list values; only FieldValue::effective does
// errors: CSV and IO failures bubble with the file path as context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Column injected by [`normalize_records`] to carry the record identifier.
pub const ID_COLUMN: &str = "id";

/// One record as returned by a listing endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawRecord {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub fields: Map<String, Value>,
}

pub type Row = HashMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
  columns: Vec<String>,
  rows: Vec<Row>,
}

impl Table {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.columns.iter().any(|c| c == name)
  }

  /// Append a row, registering any columns not seen before.
  pub fn push(&mut self, row: Row, order: impl IntoIterator<Item = String>) {
    for col in order {
      if !self.has_column(&col) {
        self.columns.push(col);
      }
    }
    self.rows.push(row);
  }

  /// New table with the same columns and only the rows matching `keep`.
  pub fn retain_rows<F>(&self, mut keep: F) -> Table
  where
    F: FnMut(&Row) -> bool,
  {
    Table {
      columns: self.columns.clone(),
      rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
    }
  }

  /// Load a CSV with a header row. Empty cells are treated as absent.
  pub fn read_csv(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
      .flexible(true)
      .from_path(path)
      .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = rdr
      .headers()
      .with_context(|| format!("reading header of {}", path.display()))?
      .iter()
      .map(|h| h.trim_start_matches('\u{feff}').to_string())
      .collect();

    let mut table = Table {
      columns: headers.clone(),
      rows: Vec::new(),
    };

    for (line, rec) in rdr.records().enumerate() {
      let rec = rec.with_context(|| format!("reading {} row {}", path.display(), line + 1))?;
      let row: Row = headers
        .iter()
        .zip(rec.iter())
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(h, cell)| (h.clone(), Value::String(cell.to_string())))
        .collect();
      table.rows.push(row);
    }

    Ok(table)
  }

  /// Write the table as CSV with a header row of all known columns.
  pub fn write_csv(&self, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(&self.columns)?;

    for row in &self.rows {
      let cells = self.columns.iter().map(|c| row.get(c).map(render_cell).unwrap_or_default());
      wtr.write_record(cells)?;
    }
    wtr.flush().with_context(|| format!("flushing {}", path.display()))?;

    Ok(())
  }
}

fn render_cell(v: &Value) -> String {
  match v {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Lookup-field shape: a value is either a scalar or a list whose first
/// element stands in for the scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
  Scalar(&'a Value),
  ListWrapped(Option<&'a Value>),
}

impl<'a> FieldValue<'a> {
  pub fn of(v: &'a Value) -> Self {
    match v {
      Value::Array(items) => FieldValue::ListWrapped(items.first()),
      other => FieldValue::Scalar(other),
    }
  }

  /// The effective scalar; empty lists and nulls are absent.
  pub fn effective(self) -> Option<&'a Value> {
    let v = match self {
      FieldValue::Scalar(v) => v,
      FieldValue::ListWrapped(first) => first?,
    };
    (!v.is_null()).then_some(v)
  }

  /// Effective scalar rendered as a grouping key.
  pub fn key(self) -> Option<String> {
    match self.effective()? {
      Value::String(s) if s.trim().is_empty() => None,
      Value::String(s) => Some(s.clone()),
      other => Some(other.to_string()),
    }
  }
}

/// Flatten `id + fields` records into a Table; fields keep their raw values.
pub fn normalize_records(records: &[RawRecord]) -> Table {
  let mut table = Table::new();

  for rec in records {
    let mut row: Row = rec.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    row.insert(ID_COLUMN.to_string(), Value::String(rec.id.clone()));

    let order = rec.fields.keys().cloned().chain(std::iter::once(ID_COLUMN.to_string()));
    table.push(row, order);
  }

  table
}
