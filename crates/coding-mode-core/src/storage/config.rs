//! TOML-based application configuration.
//!
//! Stores:
//! - Auto-trigger behaviour (which sites, how long)
//! - Authenticator provisioning and TOTP parameters
//! - Blocking-rule shape and wake-timer name
//! - An optional override of the bundled seed block list
//!
//! Configuration is stored at `~/.config/coding-mode/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::domains;
use crate::error::ConfigError;
use crate::totp::{
    TotpParams, DEFAULT_DIGITS, DEFAULT_SECRET_BYTES, DEFAULT_STEP_SECONDS,
    DEFAULT_TOLERANCE_WINDOW, MAX_TOLERANCE_WINDOW,
};

/// Session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Length of a session started by visiting a coding site.
    #[serde(default = "default_auto_trigger_minutes")]
    pub auto_trigger_minutes: f64,
    #[serde(default = "default_auto_trigger_sites")]
    pub auto_trigger_sites: Vec<String>,
}

/// Authenticator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_step_seconds")]
    pub step_seconds: u64,
    #[serde(default = "default_digits")]
    pub digits: u32,
    #[serde(default = "default_tolerance_window")]
    pub tolerance_window: u32,
    #[serde(default = "default_secret_bytes")]
    pub secret_bytes: usize,
}

/// Blocking-rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Page blocked navigations are redirected to.
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,
    #[serde(default = "default_rule_priority")]
    pub rule_priority: u32,
    #[serde(default = "default_alarm_name")]
    pub alarm_name: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/coding-mode/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Replaces the bundled seed list when set.
    #[serde(default)]
    pub default_domains: Option<Vec<String>>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
}

// Default functions
fn default_auto_trigger_minutes() -> f64 {
    30.0
}
fn default_auto_trigger_sites() -> Vec<String> {
    domains::PROGRAMMING_SITES
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_label() -> String {
    "Coding Mode: Authentication Code".into()
}
fn default_issuer() -> String {
    "Coding Mode".into()
}
fn default_step_seconds() -> u64 {
    DEFAULT_STEP_SECONDS
}
fn default_digits() -> u32 {
    DEFAULT_DIGITS
}
fn default_tolerance_window() -> u32 {
    DEFAULT_TOLERANCE_WINDOW
}
fn default_secret_bytes() -> usize {
    DEFAULT_SECRET_BYTES
}
fn default_redirect_path() -> String {
    "/blocked.html".into()
}
fn default_rule_priority() -> u32 {
    1
}
fn default_alarm_name() -> String {
    "coding-mode-session".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_trigger_minutes: default_auto_trigger_minutes(),
            auto_trigger_sites: default_auto_trigger_sites(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            issuer: default_issuer(),
            step_seconds: DEFAULT_STEP_SECONDS,
            digits: DEFAULT_DIGITS,
            tolerance_window: DEFAULT_TOLERANCE_WINDOW,
            secret_bytes: DEFAULT_SECRET_BYTES,
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            redirect_path: default_redirect_path(),
            rule_priority: 1,
            alarm_name: default_alarm_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_domains: None,
            session: SessionConfig::default(),
            auth: AuthConfig::default(),
            blocking: BlockingConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn totp_params(&self) -> TotpParams {
        TotpParams {
            step_seconds: self.step_seconds,
            digits: self.digits,
            tolerance_window: self.tolerance_window,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional fields: accept JSON, fall back to a plain string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject values the TOTP engine or rule engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if !(1..=9).contains(&self.auth.digits) {
            return Err(invalid("auth.digits", "must be between 1 and 9"));
        }
        if self.auth.tolerance_window > MAX_TOLERANCE_WINDOW {
            return Err(invalid(
                "auth.tolerance_window",
                &format!("must be at most {MAX_TOLERANCE_WINDOW}"),
            ));
        }
        if self.auth.step_seconds == 0 {
            return Err(invalid("auth.step_seconds", "must be greater than 0"));
        }
        if self.auth.secret_bytes == 0 {
            return Err(invalid("auth.secret_bytes", "must be greater than 0"));
        }
        if !(self.session.auto_trigger_minutes.is_finite() && self.session.auto_trigger_minutes > 0.0) {
            return Err(invalid("session.auto_trigger_minutes", "must be greater than 0"));
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Seed block list for first run: the override if present, else the bundled list.
    pub fn seed_domains(&self) -> Vec<String> {
        match &self.default_domains {
            Some(list) => domains::sanitize(list),
            None => domains::bundled_defaults(),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[auth]\nissuer = \"Me\"\n").unwrap();
        assert_eq!(parsed.auth.issuer, "Me");
        assert_eq!(parsed.auth.digits, 6);
        assert_eq!(parsed.blocking.redirect_path, "/blocked.html");
        assert_eq!(parsed.session.auto_trigger_minutes, 30.0);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("auth.digits").as_deref(), Some("6"));
        assert_eq!(cfg.get("blocking.alarm_name").as_deref(), Some("coding-mode-session"));
        assert!(cfg.get("auth.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("auth.tolerance_window", "2").unwrap();
        cfg.apply("blocking.redirect_path", "/stop.html").unwrap();
        cfg.apply("session.auto_trigger_minutes", "45").unwrap();
        assert_eq!(cfg.auth.tolerance_window, 2);
        assert_eq!(cfg.blocking.redirect_path, "/stop.html");
        assert_eq!(cfg.session.auto_trigger_minutes, 45.0);
    }

    #[test]
    fn apply_sets_optional_domain_override() {
        let mut cfg = Config::default();
        cfg.apply("default_domains", r#"["A.com", "https://b.com/x"]"#).unwrap();
        assert_eq!(cfg.seed_domains(), vec!["a.com", "b.com"]);
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("auth.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.apply("auth.digits", "six").is_err());
        assert!(cfg.apply("auth.digits", "12").is_err());
        assert_eq!(cfg.auth.digits, 6);
        assert!(cfg.apply("auth.tolerance_window", "4294967295").is_err());
        assert!(cfg.apply("auth.tolerance_window", "11").is_err());
        cfg.apply("auth.tolerance_window", "10").unwrap();
        assert_eq!(cfg.auth.tolerance_window, 10);
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\nstep_seconds = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
