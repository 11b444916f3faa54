use test_support::{cmd_bin, tempdir, StubServer};

const VOLUNTEERS_PAGE_1: &str = r#"{"records": [
  {"id": "v1", "fields": {"Name": "Ada", "Start Date": "2025-09-02"}},
  {"id": "v2", "fields": {"Name": "Bo", "Start Date": "2025-08-30"}}
], "offset": "p2"}"#;

const VOLUNTEERS_PAGE_2: &str = r#"{"records": [
  {"id": "v3", "fields": {"Name": "Cy", "Start Date": "2025-09-30"}}
]}"#;

const ATTENDANCE: &str = r#"{"records": [
  {"id": "a1", "fields": {"Name": "Ada", "Event Date": ["2025-09-03"]}},
  {"id": "a2", "fields": {"Name": "Ada", "Event Date": ["2025-06-10"]}},
  {"id": "a3", "fields": {"Name": "Bo", "Event Date": ["2025-04-01"]}},
  {"id": "a4", "fields": {"Name": "Cy", "Event Date": ["2025-09-12"]}},
  {"id": "a5", "fields": {"Name": "Cy", "Event Date": ["2025-09-19"]}}
]}"#;

fn airtable_stub(attendance_status: u16) -> StubServer {
  StubServer::start(move |target| {
    if target.contains("/tblVol") && target.contains("offset=p2") {
      (200, VOLUNTEERS_PAGE_2.to_string())
    } else if target.contains("/tblVol") {
      (200, VOLUNTEERS_PAGE_1.to_string())
    } else if target.contains("/tblAtt") {
      (attendance_status, ATTENDANCE.to_string())
    } else {
      (404, "{}".to_string())
    }
  })
}

fn run_volunteers(server: &StubServer, dir: &std::path::Path) -> assert_cmd::assert::Assert {
  cmd_bin("impact-report")
    .current_dir(dir)
    .env("AIRTABLE_TOKEN", "pat-test")
    .env("AIRTABLE_API_URL", format!("{}/v0", server.url()))
    .env("AIRTABLE_BASE_ID", "appTest")
    .env("AIRTABLE_VOLUNTEERS_TABLE", "tblVol")
    .env("AIRTABLE_ATTENDANCE_TABLE", "tblAtt")
    .args([
      "--source",
      "volunteers",
      "--now-override",
      "2025-10-14T12:00:00",
      "--work-dir",
      "work",
    ])
    .assert()
}

#[test]
fn volunteer_summary_is_created_then_appended() {
  let td = tempdir();
  let server = airtable_stub(200);

  run_volunteers(&server, td.path()).success();

  let ledger = td.path().join("report_summary.csv");
  let text = std::fs::read_to_string(&ledger).unwrap();
  insta::assert_snapshot!(text, @r"
  Period,Record Type,Count
  2025-09-01 to 2025-09-30,New Volunteers,2
  2025-09-01 to 2025-09-30,Unique Volunteers,2
  2025-03-05 to 2025-09-30,Volunteer return rate,66.67%
  ");
  assert!(!td.path().join("work").join("airtable_data.csv").exists());

  let seen = server.requests();
  assert_eq!(seen.len(), 3);
  assert!(seen[0].target.starts_with("/v0/appTest/tblVol"));
  assert!(seen[1].target.contains("offset=p2"));
  assert!(seen.iter().all(|r| r.header("authorization") == Some("Bearer pat-test")));

  // second run keeps the first three rows and adds three more
  run_volunteers(&server, td.path()).success();
  let text = std::fs::read_to_string(&ledger).unwrap();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(lines.len(), 7);
  assert_eq!(lines[1], lines[4]);
  assert_eq!(lines[3], lines[6]);
}

#[test]
fn failed_attendance_fetch_writes_nothing() {
  let td = tempdir();
  let server = airtable_stub(503);

  run_volunteers(&server, td.path()).failure();

  assert!(!td.path().join("report_summary.csv").exists());
  assert!(!td.path().join("work").join("airtable_data.csv").exists());
}
