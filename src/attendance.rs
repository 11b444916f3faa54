use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::DataShapeWarning;
use crate::table::{FieldValue, Table};

pub const NAME_COLUMN: &str = "Name";
pub const EVENT_DATE_COLUMN: &str = "Event Date";

/// Appearances an entity needs inside the window to count as returning.
pub const REPEAT_THRESHOLD: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReturnRate {
  pub percentage: f64,
  pub total_unique: usize,
  pub repeaters: usize,
}

impl ReturnRate {
  pub const ZERO: ReturnRate = ReturnRate {
    percentage: 0.0,
    total_unique: 0,
    repeaters: 0,
  };

  /// Percentage rounded to two decimals.
  pub fn rounded(&self) -> f64 {
    (self.percentage * 100.0).round() / 100.0
  }
}

fn require_columns(table: &Table) -> Option<DataShapeWarning> {
  [NAME_COLUMN, EVENT_DATE_COLUMN]
    .into_iter()
    .find(|c| !table.has_column(c))
    .map(|c| DataShapeWarning {
      column: c.to_string(),
      context: "attendance analysis",
    })
}

/// Rows per entity name; rows without a usable name are skipped.
fn appearances(table: &Table) -> HashMap<String, usize> {
  let mut counts: HashMap<String, usize> = HashMap::new();
  for row in table.rows() {
    if let Some(name) = row.get(NAME_COLUMN).and_then(|v| FieldValue::of(v).key()) {
      *counts.entry(name).or_insert(0) += 1;
    }
  }
  counts
}

/// Distinct entity names in an already windowed table.
pub fn unique_count(table: &Table) -> (usize, Option<DataShapeWarning>) {
  if let Some(w) = require_columns(table) {
    warn!(warning = %w, "reporting zero unique entities");
    return (0, Some(w));
  }
  (appearances(table).len(), None)
}

/// Share of entities appearing [`REPEAT_THRESHOLD`]+ times in an already
/// windowed table. Zero entities yields [`ReturnRate::ZERO`].
pub fn return_rate(table: &Table) -> (ReturnRate, Option<DataShapeWarning>) {
  if let Some(w) = require_columns(table) {
    warn!(warning = %w, "reporting zero return rate");
    return (ReturnRate::ZERO, Some(w));
  }

  let counts = appearances(table);
  let total_unique = counts.len();
  let repeaters = counts.values().filter(|n| **n >= REPEAT_THRESHOLD).count();

  let percentage = if total_unique > 0 {
    repeaters as f64 / total_unique as f64 * 100.0
  } else {
    0.0
  };

  let rate = ReturnRate {
    percentage,
    total_unique,
    repeaters,
  };
  info!(total_unique, repeaters, rate = %format!("{:.2}%", rate.percentage), "return rate computed");
  (rate, None)
}
