// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for paths, the effective reference date, work directories, and man page rendering
// role: utilities/helpers
// inputs: paths; optional now override; clap CommandFactory
// outputs: Canonicalized paths, reference date, directories ensured, man page text
// side_effects: prepare_work_dir creates directories
// invariants:
// - prepare_work_dir returns an existing directory
// - effective_today only reads the clock when no override is given
// errors: IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use clap::CommandFactory;

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> String {
  let p = p.as_ref();
  let pb: PathBuf = match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  };
  pb.to_string_lossy().to_string()
}

/// Returns the effective reporting reference date given an optional override.
///
/// Centralizes our handling of test determinism without sprinkling
/// `Local::now()` throughout the code.
pub fn effective_today(override_now: Option<DateTime<Local>>) -> NaiveDate {
  override_now.unwrap_or_else(Local::now).date_naive()
}

/// Ensure the transient-file directory exists and return its absolute path.
pub fn prepare_work_dir(dir: &Path) -> Result<PathBuf> {
  std::fs::create_dir_all(dir).with_context(|| format!("creating work dir {}", dir.display()))?;
  Ok(PathBuf::from(canonicalize_lossy(dir)))
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
