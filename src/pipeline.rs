// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one batch run: validate config, log in, run each source branch, append the ledger, clean up
// role: processing/orchestrator
// inputs: EffectiveConfig, Settings, HttpClient, BrowserLauncher, RunContext (reference date + work dir)
// outputs: Ledger rows appended; transient files removed; RunReport
// side_effects: Network and browser calls; writes/deletes files under work_dir; rewrites the ledger
// invariants:
// - Config is validated for every selected branch before any network or browser call
// - The work dir is created only after config and login succeed
// - Login failure aborts before anything is written
// - A branch whose primary fetch failed contributes no entries (no partial summary)
// - Transient files of successful branches are removed only after the ledger write
// errors: ConfigError/LoginError abort; branch failures are collected and surfaced after the write
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::attendance::{return_rate, unique_count, EVENT_DATE_COLUMN};
use crate::cli::EffectiveConfig;
use crate::config::Settings;
use crate::fetch::TableEndpoint;
use crate::filter::filter_window;
use crate::http::{HttpClient, SessionCredential};
use crate::ledger::{cleanup, Count, LedgerWrite, SummaryEntry, SummaryLedger};
use crate::period::{previous_month_window, trailing_window};
use crate::reports::{ReportDownloader, ReportKind};
use crate::session::{self, BrowserLauncher, LoginForm};
use crate::table::{normalize_records, Table};
use crate::util;

pub const START_DATE_COLUMN: &str = "Start Date";
pub const START_DATE_FORMAT: &str = "%Y-%m-%d";
pub const RETURN_RATE_MONTHS: u32 = 6;
pub const RECORDS_DUMP_FILE: &str = "airtable_data.csv";

pub const NEW_VOLUNTEERS: &str = "New Volunteers";
pub const UNIQUE_VOLUNTEERS: &str = "Unique Volunteers";
pub const VOLUNTEER_RETURN_RATE: &str = "Volunteer return rate";

#[derive(Clone, Debug)]
pub struct RunContext {
  pub today: NaiveDate,
  pub work_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct BranchOutput {
  pub entries: Vec<SummaryEntry>,
  pub transient: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct RunReport {
  pub written: Option<LedgerWrite>,
  pub entries: usize,
  pub cleanup_warnings: usize,
}

fn endpoint(settings: &Settings, table_id: &str) -> TableEndpoint {
  TableEndpoint {
    api_url: settings.airtable_api_url.clone(),
    base_id: settings.airtable_base_id.clone(),
    table_id: table_id.to_string(),
  }
}

/// Volunteer table + event attendance: new volunteers last month, unique
/// attendees last month, and the trailing return rate.
pub fn volunteers_branch(client: &dyn HttpClient, settings: &Settings, token: &str, ctx: &RunContext) -> Result<BranchOutput> {
  let month = previous_month_window(ctx.today);
  let trailing = trailing_window(ctx.today, RETURN_RATE_MONTHS);

  // Phase 1: both primary fetches, fail fast
  let volunteer_records = endpoint(settings, &settings.volunteers_table)
    .fetch(client, token)
    .context("fetching volunteer records")?;
  let attendance_records = endpoint(settings, &settings.attendance_table)
    .fetch(client, token)
    .context("fetching event attendance")?;

  // Phase 2: new volunteers in the previous month
  let volunteers = normalize_records(&volunteer_records);
  info!(rows = volunteers.len(), columns = volunteers.columns().len(), "volunteer table built");

  let new_volunteers = filter_window(&volunteers, START_DATE_COLUMN, &month, Some(START_DATE_FORMAT)).table;
  info!(%month, count = new_volunteers.len(), "volunteers filtered by start date");

  let mut out = BranchOutput::default();
  if new_volunteers.is_empty() {
    warn!(%month, "no volunteer records in the previous month");
  } else {
    let dump = ctx.work_dir.join(RECORDS_DUMP_FILE);
    new_volunteers
      .write_csv(&dump)
      .with_context(|| format!("saving {}", dump.display()))?;
    info!(path = %dump.display(), "filtered records saved");
    out.transient.push(dump);
  }

  // Phase 3: attendance metrics over two independently windowed views
  let attendance = normalize_records(&attendance_records);
  let monthly_view = filter_window(&attendance, EVENT_DATE_COLUMN, &month, None).table;
  let trailing_view = filter_window(&attendance, EVENT_DATE_COLUMN, &trailing, None).table;

  let (unique, _) = unique_count(&monthly_view);
  let (rate, _) = return_rate(&trailing_view);
  if trailing_view.is_empty() {
    warn!(%trailing, "no attendance records in the trailing window");
  }

  out.entries = vec![
    SummaryEntry::new(&month, NEW_VOLUNTEERS, Count::Integer(new_volunteers.len() as u64)),
    SummaryEntry::new(&month, UNIQUE_VOLUNTEERS, Count::Integer(unique as u64)),
    SummaryEntry::new(&trailing, VOLUNTEER_RETURN_RATE, Count::Percentage(rate.rounded())),
  ];
  Ok(out)
}

/// Download the fixed report set and count last month's rows in each.
pub fn clients_branch(
  client: &dyn HttpClient,
  settings: &Settings,
  credential: SessionCredential,
  probe: bool,
  ctx: &RunContext,
) -> Result<BranchOutput> {
  let month = previous_month_window(ctx.today);
  let downloader = ReportDownloader::new(client, credential, &settings.apricot_base_url, &ctx.work_dir);

  if probe {
    downloader.probe();
  }

  let mut downloaded: Vec<(ReportKind, PathBuf)> = Vec::new();
  let mut failed: Vec<&'static str> = Vec::new();

  for kind in ReportKind::ALL {
    match downloader.download(kind) {
      Ok(path) => downloaded.push((kind, path)),
      Err(e) => {
        error!(report = kind.human_name(), error = %e, "report download failed");
        failed.push(kind.human_name());
      }
    }
  }

  if !failed.is_empty() {
    let left: Vec<String> = downloaded.iter().map(|(_, p)| p.display().to_string()).collect();
    warn!(files = ?left, "skipping report summary; downloaded files left in place");
    bail!("report downloads failed: {}", failed.join(", "));
  }

  let mut out = BranchOutput::default();
  for (kind, path) in downloaded {
    let table = Table::read_csv(&path)?;
    let in_month = filter_window(&table, kind.date_column(), &month, None).table;
    info!(report = kind.human_name(), rows = table.len(), in_month = in_month.len(), "report filtered");

    out
      .entries
      .push(SummaryEntry::new(&month, kind.human_name(), Count::Integer(in_month.len() as u64)));
    out.transient.push(path);
  }
  Ok(out)
}

/// Launch the browser, log in, and close it again.
pub fn login_clients(launcher: &dyn BrowserLauncher, settings: &Settings, headed: bool) -> Result<SessionCredential> {
  let login = settings.require_apricot_login()?;
  let form = LoginForm::apricot(&settings.apricot_base_url);

  let mut driver = launcher.launch(headed).context("launching browser")?;
  let cred = session::login(driver.as_mut(), &form, &login.username, &login.password).context("login failed")?;
  Ok(cred)
}

pub fn run(
  cfg: &EffectiveConfig,
  settings: &Settings,
  client: &dyn HttpClient,
  launcher: &dyn BrowserLauncher,
  ctx: &RunContext,
) -> Result<RunReport> {
  // Phase 1: configuration, before any call goes out
  let token = if cfg.volunteers {
    Some(settings.require_airtable_token()?.to_string())
  } else {
    None
  };
  if cfg.clients {
    settings.require_apricot_login()?;
  }

  // Phase 2: the browser session is a blocking prerequisite
  let credential = if cfg.clients {
    Some(login_clients(launcher, settings, cfg.headed)?)
  } else {
    None
  };

  // Phase 3: independent branches, with the work dir created only now
  let ctx = &RunContext {
    today: ctx.today,
    work_dir: util::prepare_work_dir(&ctx.work_dir)?,
  };

  let mut outputs: Vec<BranchOutput> = Vec::new();
  let mut failed: Vec<&'static str> = Vec::new();

  if let Some(token) = token.as_deref() {
    match volunteers_branch(client, settings, token, ctx) {
      Ok(o) => outputs.push(o),
      Err(e) => {
        error!(branch = "volunteers", error = %format!("{e:#}"), "branch failed; no summary rows");
        failed.push("volunteers");
      }
    }
  }

  if let Some(credential) = credential {
    match clients_branch(client, settings, credential, cfg.probe, ctx) {
      Ok(o) => outputs.push(o),
      Err(e) => {
        error!(branch = "clients", error = %format!("{e:#}"), "branch failed; no summary rows");
        failed.push("clients");
      }
    }
  }

  // Phase 4: persist, then clean up
  let entries: Vec<SummaryEntry> = outputs.iter().flat_map(|o| o.entries.iter().cloned()).collect();
  let mut report = RunReport {
    written: None,
    entries: entries.len(),
    cleanup_warnings: 0,
  };

  if !entries.is_empty() {
    let ledger = SummaryLedger::new(&cfg.ledger);
    report.written = Some(ledger.append(&entries)?);

    let transient: Vec<PathBuf> = outputs.into_iter().flat_map(|o| o.transient).collect();
    report.cleanup_warnings = cleanup(&transient).len();
  }

  if !failed.is_empty() {
    bail!("sources failed: {}", failed.join(", "));
  }

  Ok(report)
}
