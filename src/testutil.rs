// Scripted stand-ins for the HTTP and browser seams.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::FetchError;
use crate::http::{GetRequest, HttpClient, HttpResponse};
use crate::session::{BrowserCookie, BrowserDriver, BrowserLauncher, Locator};

type Scripted = Result<HttpResponse, String>;

/// Replays queued responses. Routed queues (matched by url substring) win
/// over the default queue; every request is recorded.
#[derive(Default)]
pub struct ScriptedClient {
  default: RefCell<VecDeque<Scripted>>,
  routes: RefCell<Vec<(String, VecDeque<Scripted>)>>,
  sent: RefCell<Vec<GetRequest>>,
}

impl ScriptedClient {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_json(&self, status: u16, body: serde_json::Value) {
    self.push_raw(status, body.to_string().into_bytes());
  }

  pub fn push_raw(&self, status: u16, body: Vec<u8>) {
    self.default.borrow_mut().push_back(Ok(HttpResponse { status, body }));
  }

  pub fn route(&self, url_part: &str, status: u16, body: impl Into<Vec<u8>>) {
    self.route_result(url_part, Ok(HttpResponse {
      status,
      body: body.into(),
    }));
  }

  pub fn route_failure(&self, url_part: &str, message: &str) {
    self.route_result(url_part, Err(message.to_string()));
  }

  fn route_result(&self, url_part: &str, item: Scripted) {
    let mut routes = self.routes.borrow_mut();
    match routes.iter_mut().find(|(p, _)| p == url_part) {
      Some((_, q)) => q.push_back(item),
      None => routes.push((url_part.to_string(), VecDeque::from([item]))),
    }
  }

  pub fn requests(&self) -> Vec<GetRequest> {
    self.sent.borrow().clone()
  }
}

impl HttpClient for ScriptedClient {
  fn get(&self, req: &GetRequest) -> Result<HttpResponse, FetchError> {
    self.sent.borrow_mut().push(req.clone());

    let routed = self
      .routes
      .borrow_mut()
      .iter_mut()
      .filter(|(p, _)| req.url.contains(p.as_str()))
      .find_map(|(_, q)| q.pop_front());

    let next = routed.or_else(|| self.default.borrow_mut().pop_front());

    match next {
      Some(Ok(resp)) => Ok(resp),
      Some(Err(message)) => Err(FetchError::Transport {
        url: req.url.clone(),
        message,
      }),
      None => Err(FetchError::Transport {
        url: req.url.clone(),
        message: "no scripted response".into(),
      }),
    }
  }
}

/// Browser double: records actions, serves a fixed cookie jar.
#[derive(Clone, Debug, Default)]
pub struct FakeBrowser {
  pub cookies: Vec<BrowserCookie>,
  /// Visibility polls answered `false` before the interstitial appears.
  pub interstitial_visible_after: Option<u32>,
  pub fail_navigation: bool,
  pub actions: Vec<String>,
  pub pauses: Vec<Duration>,
  polls: u32,
}

impl FakeBrowser {
  pub fn with_cookies(jar: &[(&str, &str)]) -> Self {
    Self {
      cookies: jar
        .iter()
        .map(|(n, v)| BrowserCookie {
          name: n.to_string(),
          value: v.to_string(),
        })
        .collect(),
      ..Self::default()
    }
  }
}

impl BrowserDriver for FakeBrowser {
  fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
    if self.fail_navigation {
      anyhow::bail!("net::ERR_NAME_NOT_RESOLVED at {url}");
    }
    self.actions.push(format!("navigate {url}"));
    Ok(())
  }

  fn fill(&mut self, target: &Locator, value: &str) -> anyhow::Result<()> {
    self.actions.push(format!("fill {target} {value}"));
    Ok(())
  }

  fn click(&mut self, target: &Locator) -> anyhow::Result<()> {
    self.actions.push(format!("click {target}"));
    Ok(())
  }

  fn is_visible(&mut self, _target: &Locator) -> anyhow::Result<bool> {
    let Some(after) = self.interstitial_visible_after else {
      anyhow::bail!("element not found");
    };
    let visible = self.polls >= after;
    self.polls += 1;
    Ok(visible)
  }

  fn wait_for_load(&mut self) -> anyhow::Result<()> {
    Ok(())
  }

  fn pause(&mut self, dur: Duration) {
    self.pauses.push(dur);
  }

  fn cookies(&mut self) -> anyhow::Result<Vec<BrowserCookie>> {
    Ok(self.cookies.clone())
  }
}

/// Hands out clones of a prepared [`FakeBrowser`]; no browser fails the launch.
/// Each launch records the `headed` flag it was given.
#[derive(Default)]
pub struct FakeLauncher {
  browser: Option<FakeBrowser>,
  launches: RefCell<Vec<bool>>,
}

impl FakeLauncher {
  pub fn new(browser: FakeBrowser) -> Self {
    Self {
      browser: Some(browser),
      launches: RefCell::default(),
    }
  }

  pub fn failing() -> Self {
    Self::default()
  }

  pub fn launches(&self) -> Vec<bool> {
    self.launches.borrow().clone()
  }
}

impl BrowserLauncher for FakeLauncher {
  fn launch(&self, headed: bool) -> anyhow::Result<Box<dyn BrowserDriver>> {
    self.launches.borrow_mut().push(headed);
    match &self.browser {
      Some(b) => Ok(Box::new(b.clone())),
      None => anyhow::bail!("could not launch browser"),
    }
  }
}
