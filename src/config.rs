//! Process configuration read from the environment (after `.env` is loaded).

use crate::error::ConfigError;

pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_AIRTABLE_BASE_ID: &str = "appqOF4YYlalhY8so";
pub const DEFAULT_VOLUNTEERS_TABLE: &str = "tbljwCFQOomjEVWB8";
pub const DEFAULT_ATTENDANCE_TABLE: &str = "tbl7ePbU3BVJK9x0l";
pub const DEFAULT_APRICOT_BASE_URL: &str = "https://apricot.socialsolutions.com";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
  pub airtable_token: Option<String>,
  pub airtable_api_url: String,
  pub airtable_base_id: String,
  pub volunteers_table: String,
  pub attendance_table: String,
  pub apricot_username: Option<String>,
  pub apricot_password: Option<String>,
  pub apricot_base_url: String,
}

/// Credentials for the browser-gated source, present together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApricotLogin {
  pub username: String,
  pub password: String,
}

impl Settings {
  pub fn from_env() -> Self {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build from any key lookup; blank values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let or = |k: &str, default: &str| get(k).unwrap_or_else(|| default.to_string());

    Self {
      airtable_token: get("AIRTABLE_TOKEN"),
      airtable_api_url: or("AIRTABLE_API_URL", DEFAULT_AIRTABLE_API_URL),
      airtable_base_id: or("AIRTABLE_BASE_ID", DEFAULT_AIRTABLE_BASE_ID),
      volunteers_table: or("AIRTABLE_VOLUNTEERS_TABLE", DEFAULT_VOLUNTEERS_TABLE),
      attendance_table: or("AIRTABLE_ATTENDANCE_TABLE", DEFAULT_ATTENDANCE_TABLE),
      apricot_username: get("APRICOT_USERNAME"),
      apricot_password: get("APRICOT_PASSWORD"),
      apricot_base_url: or("APRICOT_BASE_URL", DEFAULT_APRICOT_BASE_URL),
    }
  }

  pub fn require_airtable_token(&self) -> Result<&str, ConfigError> {
    self.airtable_token.as_deref().ok_or(ConfigError::Missing("AIRTABLE_TOKEN"))
  }

  pub fn require_apricot_login(&self) -> Result<ApricotLogin, ConfigError> {
    let username = self.apricot_username.clone().ok_or(ConfigError::Missing("APRICOT_USERNAME"))?;
    let password = self.apricot_password.clone().ok_or(ConfigError::Missing("APRICOT_PASSWORD"))?;
    Ok(ApricotLogin { username, password })
  }
}
