use predicates::prelude::*;
use test_support::{cmd_bin, tempdir};

#[test]
fn missing_token_fails_before_writing() {
  let td = tempdir();

  cmd_bin("impact-report")
    .current_dir(td.path())
    .args(["--source", "volunteers", "--work-dir", "work"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("AIRTABLE_TOKEN"));

  assert!(!td.path().join("report_summary.csv").exists());
  assert!(!td.path().join("work").exists());
}

#[test]
fn missing_login_fails_before_launching_a_browser() {
  let td = tempdir();

  cmd_bin("impact-report")
    .current_dir(td.path())
    .env("AIRTABLE_TOKEN", "pat")
    .args(["--source", "clients"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("APRICOT_USERNAME"));

  assert!(!td.path().join("report_summary.csv").exists());
}

#[test]
fn rejects_malformed_now_override() {
  let td = tempdir();

  cmd_bin("impact-report")
    .current_dir(td.path())
    .args(["--now-override", "last week"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--now-override"));
}

#[test]
fn rejects_unknown_source() {
  cmd_bin("impact-report")
    .args(["--source", "donors"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid value"));
}
