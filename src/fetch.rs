use serde::Deserialize;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::http::{bearer, GetRequest, HttpClient};
use crate::table::RawRecord;

/// Query parameter carrying the continuation token.
pub const OFFSET_PARAM: &str = "offset";

#[derive(Debug, Deserialize)]
struct Page {
  #[serde(default)]
  records: Vec<RawRecord>,
  #[serde(default)]
  offset: Option<String>,
}

/// Follow `offset` tokens until a page comes back without one.
///
/// Pages and the records within them keep their order. Any transport error,
/// non-2xx status, or undecodable page fails the whole fetch; nothing
/// partial is returned.
pub fn fetch_all(client: &dyn HttpClient, base: &GetRequest) -> Result<Vec<RawRecord>, FetchError> {
  let mut all: Vec<RawRecord> = Vec::new();
  let mut offset: Option<String> = None;
  let mut pages = 0usize;

  loop {
    let mut req = base.clone();
    if let Some(token) = offset.take() {
      req = req.query(OFFSET_PARAM, token);
    }

    let resp = client.get(&req)?.require_success(&req.url)?;
    let page: Page = serde_json::from_slice(&resp.body).map_err(|e| FetchError::Decode {
      url: req.url.clone(),
      message: e.to_string(),
    })?;

    pages += 1;
    debug!(url = %req.url, page = pages, records = page.records.len(), "fetched page");
    all.extend(page.records);

    match page.offset {
      Some(token) if !token.is_empty() => offset = Some(token),
      _ => break,
    }
  }

  info!(url = %base.url, pages, records = all.len(), "listing fetched");
  Ok(all)
}

/// Paginated table listing behind a bearer token.
#[derive(Clone, Debug)]
pub struct TableEndpoint {
  pub api_url: String,
  pub base_id: String,
  pub table_id: String,
}

impl TableEndpoint {
  pub fn url(&self) -> String {
    format!("{}/{}/{}", self.api_url.trim_end_matches('/'), self.base_id, self.table_id)
  }

  pub fn fetch(&self, client: &dyn HttpClient, token: &str) -> Result<Vec<RawRecord>, FetchError> {
    let req = bearer(GetRequest::new(self.url()), token);
    fetch_all(client, &req)
  }
}
