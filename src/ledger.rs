// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Persist summary metrics as an append-only CSV ledger and clean up transient files afterwards
// role: persistence/ledger
// inputs: SummaryEntry list for this run; ledger path; transient file paths
// outputs: Ledger CSV with header Period,Record Type,Count
// side_effects: Reads and rewrites the ledger; deletes transient files
// invariants:
// - Existing rows are kept verbatim and in order; new rows follow in computed order
// - The rewrite lands via temp file + rename in the ledger's directory, so a crash leaves the old file intact
// - Cleanup failures are warnings, never errors
// errors: PersistError with the ledger path
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PersistError, PersistenceWarning};
use crate::period::ReportingWindow;

pub const HEADER: [&str; 3] = ["Period", "Record Type", "Count"];

#[derive(Clone, Debug, PartialEq)]
pub enum Count {
  Integer(u64),
  /// Rendered with two decimals and a percent sign.
  Percentage(f64),
}

impl std::fmt::Display for Count {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Count::Integer(n) => write!(f, "{n}"),
      Count::Percentage(p) => write!(f, "{p:.2}%"),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryEntry {
  pub period: String,
  pub record_type: String,
  pub count: Count,
}

impl SummaryEntry {
  pub fn new(window: &ReportingWindow, record_type: &str, count: Count) -> Self {
    Self {
      period: window.label(),
      record_type: record_type.to_string(),
      count,
    }
  }

  fn cells(&self) -> [String; 3] {
    [self.period.clone(), self.record_type.clone(), self.count.to_string()]
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedgerWrite {
  Created { rows: usize },
  Appended { previous: usize, added: usize },
}

pub struct SummaryLedger {
  path: PathBuf,
}

impl SummaryLedger {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn read_err(&self, e: impl std::fmt::Display) -> PersistError {
    PersistError::Read {
      path: self.path.clone(),
      message: e.to_string(),
    }
  }

  fn write_err(&self, e: impl std::fmt::Display) -> PersistError {
    PersistError::Write {
      path: self.path.clone(),
      message: e.to_string(),
    }
  }

  /// Rows currently on disk (header excluded); empty when the file is absent.
  pub fn read_rows(&self) -> Result<Vec<Vec<String>>, PersistError> {
    if !self.path.exists() {
      return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
      .flexible(true)
      .from_path(&self.path)
      .map_err(|e| self.read_err(e))?;

    let mut rows = Vec::new();
    for rec in rdr.records() {
      let rec = rec.map_err(|e| self.read_err(e))?;
      rows.push(rec.iter().map(str::to_string).collect());
    }
    Ok(rows)
  }

  /// Existing rows first, then `entries`; the whole file is rewritten.
  pub fn append(&self, entries: &[SummaryEntry]) -> Result<LedgerWrite, PersistError> {
    let existed = self.path.exists();
    let previous = self.read_rows()?;

    let dir = match self.path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
      _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| self.write_err(e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.write_err(e))?;
    {
      let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
      wtr.write_record(HEADER).map_err(|e| self.write_err(e))?;
      for (line, row) in previous.iter().enumerate() {
        wtr.write_record(fit_to_header(row, line)).map_err(|e| self.write_err(e))?;
      }
      for entry in entries {
        wtr.write_record(entry.cells()).map_err(|e| self.write_err(e))?;
      }
      wtr.flush().map_err(|e| self.write_err(e))?;
    }
    tmp.as_file_mut().flush().map_err(|e| self.write_err(e))?;
    tmp.as_file().sync_all().map_err(|e| self.write_err(e))?;
    tmp.persist(&self.path).map_err(|e| self.write_err(e.error))?;

    let outcome = if existed {
      LedgerWrite::Appended {
        previous: previous.len(),
        added: entries.len(),
      }
    } else {
      LedgerWrite::Created { rows: entries.len() }
    };

    match outcome {
      LedgerWrite::Created { rows } => info!(path = %self.path.display(), rows, "ledger created"),
      LedgerWrite::Appended { previous, added } => {
        info!(path = %self.path.display(), previous, added, "ledger appended")
      }
    }
    Ok(outcome)
  }
}

/// Pad or truncate an earlier row to the header width so a hand-edited
/// line never blocks later appends.
fn fit_to_header(row: &[String], line: usize) -> Vec<String> {
  let mut cells = row.to_vec();
  if cells.len() != HEADER.len() {
    warn!(line = line + 1, cells = cells.len(), "ledger row reshaped to {} cells", HEADER.len());
    cells.resize(HEADER.len(), String::new());
  }
  cells
}

/// Delete transient files; missing files are fine, other failures are returned.
pub fn cleanup(paths: &[PathBuf]) -> Vec<PersistenceWarning> {
  let mut warnings = Vec::new();

  for path in paths {
    match std::fs::remove_file(path) {
      Ok(()) => info!(path = %path.display(), "deleted transient file"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(source) => {
        let w = PersistenceWarning {
          path: path.clone(),
          source,
        };
        warn!(warning = %w, "cleanup failed");
        warnings.push(w);
      }
    }
  }

  warnings
}
