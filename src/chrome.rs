use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::session::{BrowserCookie, BrowserDriver, BrowserLauncher, Locator};

const ELEMENT_TIMEOUT: Duration = Duration::from_secs(20);

fn xpath_literal(s: &str) -> String {
  if !s.contains('\'') {
    return format!("'{s}'");
  }
  let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
  format!("concat({})", parts.join(", \"'\", "))
}

/// XPath for an accessible role + name pair, covering the usual ways a form
/// labels its controls.
pub fn role_xpath(role: &str, name: &str) -> String {
  let n = xpath_literal(name);
  match role {
    "textbox" => format!(
      "//input[(not(@type) or @type='text' or @type='password' or @type='email') and \
       (@aria-label={n} or @placeholder={n} or @name={n} or @id=//label[normalize-space()={n}]/@for)] | \
       //textarea[@aria-label={n} or @placeholder={n}]"
    ),
    "button" => format!(
      "//button[normalize-space()={n} or @aria-label={n}] | \
       //input[(@type='submit' or @type='button') and @value={n}] | \
       //*[@role='button' and normalize-space()={n}]"
    ),
    other => format!("//*[@role='{other}' and (normalize-space()={n} or @aria-label={n})]"),
  }
}

/// Chrome over the DevTools protocol. Keeps the browser process alive for
/// as long as the tab is in use.
pub struct ChromeDriver {
  _browser: Browser,
  tab: Arc<Tab>,
}

impl ChromeDriver {
  pub fn launch(headed: bool) -> Result<Self> {
    let opts = LaunchOptions::default_builder()
      .headless(!headed)
      .build()
      .map_err(|e| anyhow!("chrome launch options: {e}"))?;
    let browser = Browser::new(opts).context("starting chrome")?;
    let tab = browser.new_tab().context("opening tab")?;
    tab.set_default_timeout(ELEMENT_TIMEOUT);

    Ok(Self { _browser: browser, tab })
  }

  fn find(&self, target: &Locator) -> Result<headless_chrome::Element<'_>> {
    self
      .tab
      .wait_for_xpath(&role_xpath(&target.role, &target.name))
      .with_context(|| format!("locating {target}"))
  }
}

impl BrowserDriver for ChromeDriver {
  fn navigate(&mut self, url: &str) -> Result<()> {
    self.tab.navigate_to(url)?;
    Ok(())
  }

  fn fill(&mut self, target: &Locator, value: &str) -> Result<()> {
    self.find(target)?.type_into(value)?;
    Ok(())
  }

  fn click(&mut self, target: &Locator) -> Result<()> {
    self.find(target)?.click()?;
    Ok(())
  }

  fn is_visible(&mut self, target: &Locator) -> Result<bool> {
    // single probe; the caller owns the polling
    let Ok(el) = self.tab.find_element_by_xpath(&role_xpath(&target.role, &target.name)) else {
      return Ok(false);
    };

    let shown = el.call_js_fn(
      "function() { const r = this.getBoundingClientRect(); return r.width > 0 && r.height > 0; }",
      vec![],
      false,
    )?;
    Ok(shown.value.and_then(|v| v.as_bool()).unwrap_or(false))
  }

  fn wait_for_load(&mut self) -> Result<()> {
    self.tab.wait_until_navigated()?;
    Ok(())
  }

  fn pause(&mut self, dur: Duration) {
    std::thread::sleep(dur);
  }

  fn cookies(&mut self) -> Result<Vec<BrowserCookie>> {
    let jar = self.tab.get_cookies()?;
    Ok(
      jar
        .into_iter()
        .map(|c| BrowserCookie {
          name: c.name,
          value: c.value,
        })
        .collect(),
    )
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChromeLauncher;

impl BrowserLauncher for ChromeLauncher {
  fn launch(&self, headed: bool) -> Result<Box<dyn BrowserDriver>> {
    Ok(Box::new(ChromeDriver::launch(headed)?))
  }
}
