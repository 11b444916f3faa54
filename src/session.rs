// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive a browser through the login form and hand the session cookies to the plain HTTP client
// role: auth/session-bridge
// inputs: BrowserDriver implementation, LoginForm (urls + locators), username/password from Settings
// outputs: SessionCredential (PHPSESSID + CSRFTOKEN) threaded by value into HTTP callers
// side_effects: Browser navigation, form input and clicks via the driver
// invariants:
// - Both cookies or nothing: a partial credential is a LoginError
// - A missing interstitial "Continue" control never fails the login
// - The interstitial wait is a bounded poll, not a fixed sleep
// errors: Driver failures on the primary path become LoginError::Browser
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::error::LoginError;
use crate::http::{SessionCredential, CSRF_COOKIE, SESSION_COOKIE};

/// An element found by accessible role plus visible name (label,
/// placeholder, or text).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
  pub role: String,
  pub name: String,
}

impl Locator {
  pub fn role(role: &str, name: &str) -> Self {
    Locator {
      role: role.to_string(),
      name: name.to_string(),
    }
  }
}

impl std::fmt::Display for Locator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "role={}[name=\"{}\"]", self.role, self.name)
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserCookie {
  pub name: String,
  pub value: String,
}

// --- Trait seam for browser automation ---
pub trait BrowserDriver {
  fn navigate(&mut self, url: &str) -> anyhow::Result<()>;
  fn fill(&mut self, target: &Locator, value: &str) -> anyhow::Result<()>;
  fn click(&mut self, target: &Locator) -> anyhow::Result<()>;
  /// `Ok(false)` when the element is absent or hidden.
  fn is_visible(&mut self, target: &Locator) -> anyhow::Result<bool>;
  /// Block until the page has finished loading / the network is idle.
  fn wait_for_load(&mut self) -> anyhow::Result<()>;
  fn pause(&mut self, dur: Duration);
  fn cookies(&mut self) -> anyhow::Result<Vec<BrowserCookie>>;
}

pub trait BrowserLauncher {
  fn launch(&self, headed: bool) -> anyhow::Result<Box<dyn BrowserDriver>>;
}

#[derive(Clone, Debug)]
pub struct LoginForm {
  pub login_url: String,
  pub username: Locator,
  pub password: Locator,
  pub submit: Locator,
  pub interstitial: Locator,
  /// Fixed delay after submit, for pages that give no load signal.
  pub settle: Duration,
  pub poll_attempts: u32,
  pub poll_interval: Duration,
}

impl LoginForm {
  pub fn apricot(base_url: &str) -> Self {
    Self {
      login_url: format!("{}/auth", base_url.trim_end_matches('/')),
      username: Locator::role("textbox", "Username"),
      password: Locator::role("textbox", "Password"),
      submit: Locator::role("button", "Log In to Apricot"),
      interstitial: Locator::role("button", "Continue"),
      settle: Duration::from_secs(2),
      poll_attempts: 10,
      poll_interval: Duration::from_millis(500),
    }
  }
}

/// Progress of the optional interstitial step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterstitialState {
  AwaitingControl { attempt: u32 },
  ControlHandled,
  TimedOutAcceptable,
}

/// Poll for the interstitial control and click it once it shows up.
///
/// Probe errors count as "not there yet"; running out of attempts is an
/// accepted outcome, not a failure.
pub fn dismiss_interstitial(driver: &mut dyn BrowserDriver, form: &LoginForm) -> InterstitialState {
  let mut state = InterstitialState::AwaitingControl { attempt: 0 };

  while let InterstitialState::AwaitingControl { attempt } = state {
    if attempt >= form.poll_attempts {
      state = InterstitialState::TimedOutAcceptable;
      break;
    }

    match driver.is_visible(&form.interstitial) {
      Ok(true) => {
        state = match driver.click(&form.interstitial).and_then(|_| driver.wait_for_load()) {
          Ok(()) => InterstitialState::ControlHandled,
          Err(e) => {
            warn!(control = %form.interstitial, error = %format!("{e:#}"), "interstitial click failed; continuing");
            InterstitialState::TimedOutAcceptable
          }
        };
      }
      Ok(false) | Err(_) => {
        driver.pause(form.poll_interval);
        state = InterstitialState::AwaitingControl { attempt: attempt + 1 };
      }
    }
  }

  debug!(?state, "interstitial step finished");
  state
}

/// Pick the two session cookies out of a cookie jar.
pub fn extract_credential(cookies: &[BrowserCookie]) -> Result<SessionCredential, LoginError> {
  let find = |name: &str| {
    cookies
      .iter()
      .find(|c| c.name == name && !c.value.is_empty())
      .map(|c| c.value.clone())
  };

  match (find(SESSION_COOKIE), find(CSRF_COOKIE)) {
    (Some(session_id), Some(csrf_token)) => Ok(SessionCredential { session_id, csrf_token }),
    (s, c) => {
      let missing: Vec<&str> = [(SESSION_COOKIE, s.is_none()), (CSRF_COOKIE, c.is_none())]
        .iter()
        .filter(|(_, gone)| *gone)
        .map(|(n, _)| *n)
        .collect();
      Err(LoginError::MissingCookies {
        missing: missing.join(", "),
      })
    }
  }
}

fn submit_login(driver: &mut dyn BrowserDriver, form: &LoginForm, username: &str, password: &str) -> anyhow::Result<()> {
  driver
    .navigate(&form.login_url)
    .with_context(|| format!("opening {}", form.login_url))?;
  driver.wait_for_load()?;

  driver.click(&form.username)?;
  driver
    .fill(&form.username, username)
    .with_context(|| format!("filling {}", form.username))?;
  driver.click(&form.password)?;
  driver
    .fill(&form.password, password)
    .with_context(|| format!("filling {}", form.password))?;

  driver
    .click(&form.submit)
    .with_context(|| format!("clicking {}", form.submit))?;
  driver.wait_for_load()?;
  driver.pause(form.settle);

  Ok(())
}

/// Log in through the browser and return the session credential.
pub fn login(
  driver: &mut dyn BrowserDriver,
  form: &LoginForm,
  username: &str,
  password: &str,
) -> Result<SessionCredential, LoginError> {
  info!(url = %form.login_url, "logging in through browser");

  submit_login(driver, form, username, password).map_err(LoginError::Browser)?;

  match dismiss_interstitial(driver, form) {
    InterstitialState::ControlHandled => info!("interstitial dismissed"),
    _ => info!("no interstitial shown"),
  }

  let jar = driver.cookies().context("reading cookie jar").map_err(LoginError::Browser)?;
  let cred = extract_credential(&jar)?;

  info!("session cookies extracted");
  Ok(cred)
}
