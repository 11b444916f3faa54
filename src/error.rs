// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed failure taxonomy for configuration, fetch, login and persistence plus non-fatal warnings
// role: errors/taxonomy
// outputs: ConfigError, FetchError, LoginError, PersistError, DataShapeWarning, PersistenceWarning
// invariants:
// - Fatal kinds are Error types; warnings are plain values that callers log and carry on
// - Every variant names the thing that failed (key, url, path, column)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("required setting {0} is not set (add it to the environment or .env)")]
  Missing(&'static str),
}

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request to {url} failed: {message}")]
  Transport { url: String, message: String },

  #[error("{url} answered with HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("could not decode response from {url}: {message}")]
  Decode { url: String, message: String },

  #[error("writing {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Error)]
pub enum LoginError {
  #[error("browser automation failed: {0:#}")]
  Browser(anyhow::Error),

  #[error("login finished without session cookies (missing: {missing})")]
  MissingCookies { missing: String },
}

#[derive(Debug, Error)]
pub enum PersistError {
  #[error("reading ledger {path}: {message}")]
  Read { path: PathBuf, message: String },

  #[error("writing ledger {path}: {message}")]
  Write { path: PathBuf, message: String },
}

/// An expected column was absent; the operation fell back to a safe default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataShapeWarning {
  pub column: String,
  pub context: &'static str,
}

impl std::fmt::Display for DataShapeWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "column '{}' not found ({})", self.column, self.context)
  }
}

/// A transient file could not be removed after a successful ledger write.
#[derive(Debug)]
pub struct PersistenceWarning {
  pub path: PathBuf,
  pub source: std::io::Error,
}

impl std::fmt::Display for PersistenceWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "could not delete {}: {}", self.path.display(), self.source)
  }
}
