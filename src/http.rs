// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Minimal HTTP GET seam used by listing fetches, report downloads and the connectivity probe
// role: transport/http
// inputs: GetRequest (url, query pairs, headers, timeout)
// outputs: HttpResponse (status + raw body bytes)
// side_effects: Network calls through ureq
// invariants:
// - Non-2xx statuses are returned as responses, not transport errors; callers classify them
// - Credentials travel inside each request (no process-wide session)
// errors: Transport failures map to FetchError::Transport with the url
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetRequest {
  pub url: String,
  pub query: Vec<(String, String)>,
  pub headers: Vec<(String, String)>,
  pub timeout: Duration,
}

impl GetRequest {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      query: Vec::new(),
      headers: Vec::new(),
      timeout: DEFAULT_TIMEOUT,
    }
  }

  pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((key.into(), value.into()));
    self
  }

  pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((key.into(), value.into()));
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Turn a non-2xx answer into `FetchError::Status`.
  pub fn require_success(self, url: &str) -> Result<Self, FetchError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(FetchError::Status {
        url: url.to_string(),
        status: self.status,
      })
    }
  }
}

// --- Trait seam for HTTP ---
pub trait HttpClient {
  fn get(&self, req: &GetRequest) -> Result<HttpResponse, FetchError>;
}

/// Session cookies minted by a browser login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredential {
  pub session_id: String,
  pub csrf_token: String,
}

pub const SESSION_COOKIE: &str = "PHPSESSID";
pub const CSRF_COOKIE: &str = "CSRFTOKEN";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:143.0) Gecko/20100101 Firefox/143.0";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

impl SessionCredential {
  pub fn cookie_header(&self) -> String {
    format!(
      "{}={}; {}={}",
      SESSION_COOKIE, self.session_id, CSRF_COOKIE, self.csrf_token
    )
  }

  /// Decorate a request so the remote sees the browser's session.
  pub fn apply(&self, req: GetRequest) -> GetRequest {
    req
      .header("User-Agent", BROWSER_USER_AGENT)
      .header("Accept", BROWSER_ACCEPT)
      .header("Cookie", self.cookie_header())
  }
}

/// Bearer token for API-key style sources.
pub fn bearer(req: GetRequest, token: &str) -> GetRequest {
  req
    .header("Authorization", format!("Bearer {}", token))
    .header("Content-Type", "application/json")
}

#[derive(Clone, Debug, Default)]
pub struct UreqClient;

impl HttpClient for UreqClient {
  fn get(&self, req: &GetRequest) -> Result<HttpResponse, FetchError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(req.timeout))
      .http_status_as_error(false)
      .build()
      .into();

    let mut call = agent.get(&req.url);

    for (k, v) in &req.query {
      call = call.query(k, v);
    }

    for (k, v) in &req.headers {
      call = call.header(k.as_str(), v.as_str());
    }

    let transport = |e: ureq::Error| FetchError::Transport {
      url: req.url.clone(),
      message: e.to_string(),
    };

    let mut resp = call.call().map_err(transport)?;
    let status = resp.status().as_u16();
    let body = resp
      .body_mut()
      .with_config()
      .limit(u64::MAX)
      .read_to_vec()
      .map_err(transport)?;

    Ok(HttpResponse { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn credential_presents_both_cookies() {
    let cred = SessionCredential {
      session_id: "abc".into(),
      csrf_token: "xyz".into(),
    };
    let req = cred.apply(GetRequest::new("https://example.test/report"));

    assert!(req
      .headers
      .contains(&("Cookie".to_string(), "PHPSESSID=abc; CSRFTOKEN=xyz".to_string())));
    assert!(req.headers.iter().any(|(k, _)| k == "User-Agent"));
  }

  #[test]
  fn require_success_classifies_status() {
    let ok = HttpResponse {
      status: 204,
      body: Vec::new(),
    };
    assert!(ok.require_success("u").is_ok());

    let err = HttpResponse {
      status: 401,
      body: Vec::new(),
    }
    .require_success("https://example.test/x")
    .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 401, .. }));
  }

  #[test]
  fn transport_error_path_is_graceful() {
    // Use an obviously invalid host to force an error quickly
    let req = GetRequest::new("http://invalid.localdomain.invalid/").timeout(Duration::from_secs(5));
    let err = UreqClient.get(&req).unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
  }
}
