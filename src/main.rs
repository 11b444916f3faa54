use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod attendance;
mod chrome;
mod cli;
mod config;
mod error;
mod fetch;
mod filter;
mod http;
mod ledger;
mod period;
mod pipeline;
mod reports;
mod session;
mod table;
#[cfg(any(test, feature = "testutil"))]
mod testutil;
mod util;

use crate::cli::{normalize, Cli};
use crate::ledger::LedgerWrite;

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn main() -> Result<()> {
  // .env is optional; real environment variables win
  let _ = dotenvy::dotenv();
  init_tracing();

  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  // Phase 1: normalize CLI and read settings
  let cfg = normalize(cli)?;
  let settings = config::Settings::from_env();

  // Phase 2: resolve the reference date; the work dir is created by the pipeline
  let now_opt = period::parse_now_override(cfg.now_override.as_deref());
  let ctx = pipeline::RunContext {
    today: util::effective_today(now_opt),
    work_dir: cfg.work_dir.clone(),
  };
  info!(today = %ctx.today, work_dir = %ctx.work_dir.display(), "starting run");

  // Phase 3: run the selected branches
  let report = pipeline::run(&cfg, &settings, &http::UreqClient, &chrome::ChromeLauncher, &ctx)?;

  match report.written {
    Some(LedgerWrite::Created { rows }) => info!(rows, entries = report.entries, ledger = %cfg.ledger.display(), "summary saved"),
    Some(LedgerWrite::Appended { previous, added }) => {
      info!(previous, added, ledger = %cfg.ledger.display(), "summary saved")
    }
    None => info!("no summary rows produced"),
  }
  if report.cleanup_warnings > 0 {
    info!(count = report.cleanup_warnings, "some transient files could not be removed");
  }

  Ok(())
}
