use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DataShapeWarning;
use crate::period::ReportingWindow;
use crate::table::{FieldValue, Table};

/// Result of parsing one date cell. Unparsable input is `NoDate`, never an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellDate {
  Date(NaiveDate),
  NoDate,
}

impl CellDate {
  pub fn date(self) -> Option<NaiveDate> {
    match self {
      CellDate::Date(d) => Some(d),
      CellDate::NoDate => None,
    }
  }
}

const DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d",
  "%m/%d/%Y",
  "%m/%d/%y",
  "%Y/%m/%d",
  "%m-%d-%Y",
  "%B %d, %Y",
  "%b %d, %Y",
  "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%m/%d/%Y %H:%M:%S",
  "%m/%d/%Y %H:%M",
  "%m/%d/%Y %I:%M %p",
  "%m/%d/%Y %I:%M:%S %p",
  "%m/%d/%y %H:%M",
  "%m/%d/%y %I:%M %p",
];

/// Years below this are misreads ("9/3/25" as year 25), not real records.
const MIN_YEAR: i32 = 1000;

fn plausible(day: NaiveDate) -> Option<NaiveDate> {
  (day.year() >= MIN_YEAR).then_some(day)
}

fn parse_with_format(s: &str, fmt: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s, fmt)
    .ok()
    .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
    .and_then(plausible)
}

/// Natural-language dates ("Wednesday, Sept 3 2025") only count when they
/// name a 4-digit year and resolve to a single day. Bare numbers, month
/// names and years would otherwise resolve against the wall clock.
fn parse_natural(s: &str) -> Option<NaiveDate> {
  static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").unwrap());
  if !RE_YEAR.is_match(s) {
    return None;
  }

  let (start, end, _) = two_timer::parse(s, None).ok()?;
  if end - start > Duration::days(1) {
    return None;
  }
  plausible(start.date())
}

fn parse_free(s: &str) -> Option<NaiveDate> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return plausible(dt.date_naive());
  }

  DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok().and_then(|dt| plausible(dt.date())))
    .or_else(|| {
      DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok().and_then(plausible))
    })
    .or_else(|| parse_natural(s))
}

/// Parse a cell into a calendar date.
///
/// - lookup lists are unwrapped to their first element first
/// - with `format` only that format is tried; otherwise a set of common
///   date/datetime shapes, then natural language
/// - anything else (numbers, empty, garbage) is [`CellDate::NoDate`]
pub fn parse_cell_date(value: &Value, format: Option<&str>) -> CellDate {
  let Some(Value::String(raw)) = FieldValue::of(value).effective() else {
    return CellDate::NoDate;
  };
  let s = raw.trim();

  if s.is_empty() {
    return CellDate::NoDate;
  }

  let parsed = match format {
    Some(fmt) => parse_with_format(s, fmt),
    None => parse_free(s),
  };

  parsed.map(CellDate::Date).unwrap_or(CellDate::NoDate)
}

/// Output of [`filter_window`]; `warning` is set when the column was missing
/// and the input was passed through unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Filtered {
  pub table: Table,
  pub warning: Option<DataShapeWarning>,
}

/// Keep rows whose `column` date lies within `window` (inclusive).
///
/// Rows with a missing or unparsable date are dropped. A table without the
/// column comes back unchanged with a warning. Cell values are never
/// rewritten, so filtering twice with the same window is a no-op.
pub fn filter_window(table: &Table, column: &str, window: &ReportingWindow, format: Option<&str>) -> Filtered {
  if !table.has_column(column) {
    let warning = DataShapeWarning {
      column: column.to_string(),
      context: "window filter",
    };
    warn!(%warning, rows = table.len(), "skipping date filter");
    return Filtered {
      table: table.clone(),
      warning: Some(warning),
    };
  }

  let mut undated = 0usize;
  let kept = table.retain_rows(|row| {
    match row.get(column).map(|v| parse_cell_date(v, format)) {
      Some(CellDate::Date(day)) => window.contains(day),
      _ => {
        undated += 1;
        false
      }
    }
  });

  debug!(column, undated, "rows without a usable date were dropped");
  Filtered {
    table: kept,
    warning: None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::{normalize_records, RawRecord};
  use proptest::prelude::*;
  use serde_json::json;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn sept() -> ReportingWindow {
    ReportingWindow {
      start: d(2025, 9, 1),
      end: d(2025, 9, 30),
    }
  }

  fn table_of(dates: &[Value]) -> Table {
    let records: Vec<RawRecord> = dates
      .iter()
      .enumerate()
      .map(|(i, v)| RawRecord {
        id: format!("rec{i}"),
        fields: json!({ "Start Date": v }).as_object().cloned().unwrap(),
      })
      .collect();
    normalize_records(&records)
  }

  #[test]
  fn parses_common_shapes() {
    assert_eq!(parse_cell_date(&json!("2025-09-03"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("09/03/2025"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("2025-09-03T18:30:00.000Z"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("2025-09-03 08:15:00"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!(["2025-09-03"]), None).date(), Some(d(2025, 9, 3)));
  }

  #[test]
  fn unparsable_values_become_no_date() {
    assert_eq!(parse_cell_date(&json!("soon-ish ???"), None), CellDate::NoDate);
    assert_eq!(parse_cell_date(&json!(""), None), CellDate::NoDate);
    assert_eq!(parse_cell_date(&json!([]), None), CellDate::NoDate);
    assert_eq!(parse_cell_date(&json!(20250903), None), CellDate::NoDate);
    assert_eq!(parse_cell_date(&Value::Null, None), CellDate::NoDate);
  }

  #[test]
  fn partial_and_bare_values_are_not_dates() {
    for raw in ["12", "1", "September", "2025", "2025-09", "Sept 2025", "next week"] {
      assert_eq!(parse_cell_date(&json!(raw), None), CellDate::NoDate, "{raw:?}");
    }
  }

  #[test]
  fn two_digit_years_are_read_as_this_century() {
    assert_eq!(parse_cell_date(&json!("9/3/25"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("09/30/25 17:00"), None).date(), Some(d(2025, 9, 30)));
    assert_eq!(parse_cell_date(&json!("0025-09-03"), Some("%Y-%m-%d")), CellDate::NoDate);
  }

  #[test]
  fn spelled_out_dates_need_day_and_year() {
    assert_eq!(parse_cell_date(&json!("September 3, 2025"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("3 September 2025"), None).date(), Some(d(2025, 9, 3)));
    assert_eq!(parse_cell_date(&json!("September"), None), CellDate::NoDate);
  }

  #[test]
  fn fixed_format_is_strict() {
    assert_eq!(
      parse_cell_date(&json!("2025-09-03"), Some("%Y-%m-%d")).date(),
      Some(d(2025, 9, 3))
    );
    assert_eq!(parse_cell_date(&json!("09/03/2025"), Some("%Y-%m-%d")), CellDate::NoDate);
  }

  #[test]
  fn keeps_inclusive_bounds_and_drops_the_rest() {
    let t = table_of(&[
      json!("2025-08-31"),
      json!("2025-09-01"),
      json!("2025-09-15"),
      json!("2025-09-30"),
      json!("2025-10-01"),
      json!("garbage"),
      json!(["2025-09-10"]),
      json!([]),
    ]);
    let f = filter_window(&t, "Start Date", &sept(), None);

    assert!(f.warning.is_none());
    let ids: Vec<&Value> = f.table.rows().iter().map(|r| &r["id"]).collect();
    assert_eq!(ids, vec![&json!("rec1"), &json!("rec2"), &json!("rec3"), &json!("rec6")]);
    // input untouched
    assert_eq!(t.len(), 8);
  }

  #[test]
  fn rows_missing_the_cell_are_dropped() {
    let mut t = table_of(&[json!("2025-09-02")]);
    t.push(
      [("id".to_string(), json!("bare"))].into_iter().collect(),
      ["id".to_string()],
    );
    let f = filter_window(&t, "Start Date", &sept(), None);
    assert_eq!(f.table.len(), 1);
  }

  #[test]
  fn missing_column_is_passthrough_with_warning() {
    let t = table_of(&[json!("2025-09-02"), json!("2024-01-01")]);
    let f = filter_window(&t, "Event Date", &sept(), None);

    assert_eq!(f.table, t);
    let w = f.warning.expect("warning");
    assert_eq!(w.column, "Event Date");
  }

  proptest! {
    #[test]
    fn filtering_is_idempotent(offsets in proptest::collection::vec(-60i64..90, 0..40)) {
      let base = d(2025, 8, 1);
      let cells: Vec<Value> = offsets
        .iter()
        .map(|o| json!((base + chrono::Duration::days(*o)).format("%Y-%m-%d").to_string()))
        .collect();
      let t = table_of(&cells);

      let once = filter_window(&t, "Start Date", &sept(), Some("%Y-%m-%d")).table;
      let twice = filter_window(&once, "Start Date", &sept(), Some("%Y-%m-%d")).table;

      prop_assert_eq!(&once, &twice);
      for row in once.rows() {
        let day = parse_cell_date(&row["Start Date"], None).date().unwrap();
        prop_assert!(sept().contains(day));
      }
    }
  }
}
