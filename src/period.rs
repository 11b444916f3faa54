use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};

// Reporting-window arithmetic lives here so the pipeline only sees dates.

/// Days per month used by the trailing window. A "6-month" window is a flat
/// 180 days, not calendar-exact month subtraction.
pub const DAYS_PER_TRAILING_MONTH: i64 = 30;

/// Inclusive calendar-date interval `[start, end]`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ReportingWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl ReportingWindow {
  pub fn contains(&self, day: NaiveDate) -> bool {
    self.start <= day && day <= self.end
  }

  /// Ledger period label, `YYYY-MM-DD to YYYY-MM-DD`.
  pub fn label(&self) -> String {
    format!("{} to {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
  }
}

impl std::fmt::Display for ReportingWindow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.label())
  }
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
  // day 1 exists in every month
  day - Duration::days(i64::from(day.day0()))
}

/// First and last calendar day of the month before `now`'s month.
pub fn previous_month_window(now: NaiveDate) -> ReportingWindow {
  let end = first_of_month(now) - Duration::days(1);
  ReportingWindow {
    start: first_of_month(end),
    end,
  }
}

/// Ends where [`previous_month_window`] ends; starts `30 * months` days before
/// the previous month's first day.
pub fn trailing_window(now: NaiveDate, months: u32) -> ReportingWindow {
  let prev = previous_month_window(now);
  ReportingWindow {
    start: prev.start - Duration::days(DAYS_PER_TRAILING_MONTH * i64::from(months)),
    end: prev.end,
  }
}

/// Parse a `--now-override` string into a local DateTime.
/// Accepts RFC3339 (e.g. 2025-08-15T12:00:00Z) or a naive local timestamp
/// formatted as `%Y-%m-%dT%H:%M:%S`.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Local>> {
  s.and_then(|raw| {
    chrono::DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Local))
      .or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .and_then(|ndt| ndt.and_local_timezone(Local).single())
      })
  })
}
