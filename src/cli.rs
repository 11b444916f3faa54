use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Source {
  All,
  Volunteers,
  Clients,
}

#[derive(Parser, Debug)]
#[command(
    name = "impact-report",
    version,
    about = "Summarize last month's program records into a CSV ledger",
    long_about = None
)]
pub struct Cli {
  /// Show the browser window while logging in (debugging)
  #[arg(long)]
  pub headed: bool,

  /// Which record sources to summarize
  #[arg(long, value_enum, default_value_t = Source::All)]
  pub source: Source,

  /// Summary ledger CSV; created on first run, appended afterwards
  #[arg(long, default_value = "report_summary.csv")]
  pub ledger: PathBuf,

  /// Directory for transient downloads and record dumps
  #[arg(long, default_value = ".")]
  pub work_dir: PathBuf,

  /// After logging in, check that the session is accepted (warning only)
  #[arg(long)]
  pub probe: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant used to pick the reporting month (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EffectiveConfig {
  pub volunteers: bool,
  pub clients: bool,
  pub headed: bool,
  pub probe: bool,
  pub ledger: PathBuf,
  pub work_dir: PathBuf,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  if let Some(raw) = cli.now_override.as_deref() {
    if crate::period::parse_now_override(Some(raw)).is_none() {
      bail!("invalid --now-override {raw:?}; expected RFC3339 or %Y-%m-%dT%H:%M:%S");
    }
  }

  let (volunteers, clients) = match cli.source {
    Source::All => (true, true),
    Source::Volunteers => (true, false),
    Source::Clients => (false, true),
  };

  if cli.headed && !clients {
    tracing::warn!("--headed has no effect without the clients source");
  }

  Ok(EffectiveConfig {
    volunteers,
    clients,
    headed: cli.headed,
    probe: cli.probe,
    ledger: PathBuf::from(util::canonicalize_lossy(&cli.ledger)),
    work_dir: cli.work_dir,
    now_override: cli.now_override,
  })
}
