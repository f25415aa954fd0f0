//! The single persisted session record and its first-run bootstrap.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains;
use crate::error::StorageError;
use crate::storage::Store;

pub const KEY_SESSION_END: &str = "sessionEnd";
pub const KEY_AUTH_ENABLED: &str = "authEnabled";
pub const KEY_TOTP_SECRET: &str = "totpSecret";
pub const KEY_BLOCKED_DOMAINS: &str = "blockedDomains";
pub const KEY_AUTO_TRIGGER_ENABLED: &str = "autoTriggerEnabled";

pub const ALL_KEYS: [&str; 5] = [
    KEY_SESSION_END,
    KEY_AUTH_ENABLED,
    KEY_TOTP_SECRET,
    KEY_BLOCKED_DOMAINS,
    KEY_AUTO_TRIGGER_ENABLED,
];

/// Everything the engine persists. Exactly one exists per store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Absolute deadline in epoch milliseconds; `None` means no session.
    pub session_end: Option<i64>,
    pub auth_enabled: bool,
    pub totp_secret: Option<String>,
    pub blocked_domains: Vec<String>,
    pub auto_trigger_enabled: bool,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            session_end: None,
            auth_enabled: false,
            totp_secret: None,
            blocked_domains: Vec::new(),
            auto_trigger_enabled: true,
        }
    }
}

impl SessionRecord {
    /// Read all fields. Values of the wrong type read as their defaults, and
    /// the domain list is re-sanitized on the way out.
    pub fn load<S: Store + ?Sized>(store: &S) -> Result<Self, StorageError> {
        let session_end = store.get(KEY_SESSION_END)?.and_then(|v| epoch_ms(&v));
        let auth_enabled = store
            .get(KEY_AUTH_ENABLED)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let totp_secret = store
            .get(KEY_TOTP_SECRET)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.trim().is_empty());
        let blocked_domains = store
            .get(KEY_BLOCKED_DOMAINS)?
            .map(|v| string_list(&v))
            .map(|list| domains::sanitize(&list))
            .unwrap_or_default();
        let auto_trigger_enabled = store
            .get(KEY_AUTO_TRIGGER_ENABLED)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        Ok(Self {
            session_end,
            auth_enabled,
            totp_secret,
            blocked_domains,
            auto_trigger_enabled,
        })
    }

    /// Fill in any field that is missing or has the wrong type, and union
    /// the stored block list with `seed`, existing entries first.
    ///
    /// Returns whether anything was written.
    pub fn ensure_defaults<S: Store + ?Sized>(store: &S, seed: &[String]) -> Result<bool, StorageError> {
        let mut updates: Vec<(&str, Value)> = Vec::new();

        let existing = match store.get(KEY_BLOCKED_DOMAINS)? {
            Some(value @ Value::Array(_)) => Some(string_list(&value)),
            _ => None,
        };
        let merged = domains::sanitize(existing.iter().flatten().chain(seed.iter()));
        if existing.as_ref() != Some(&merged) {
            updates.push(blocked_domains_entry(&merged));
        }
        if !matches!(store.get(KEY_AUTH_ENABLED)?, Some(Value::Bool(_))) {
            updates.push((KEY_AUTH_ENABLED, Value::Bool(false)));
        }
        if !matches!(store.get(KEY_AUTO_TRIGGER_ENABLED)?, Some(Value::Bool(_))) {
            updates.push((KEY_AUTO_TRIGGER_ENABLED, Value::Bool(true)));
        }
        if store.get(KEY_TOTP_SECRET)?.is_none() {
            updates.push((KEY_TOTP_SECRET, Value::Null));
        }
        if store.get(KEY_SESSION_END)?.is_none() {
            updates.push((KEY_SESSION_END, Value::Null));
        }

        if updates.is_empty() {
            return Ok(false);
        }
        store.set_many(&updates)?;
        Ok(true)
    }
}

pub(crate) fn session_end_entry(session_end: Option<i64>) -> (&'static str, Value) {
    (
        KEY_SESSION_END,
        session_end.map(Value::from).unwrap_or(Value::Null),
    )
}

pub(crate) fn blocked_domains_entry(domains: &[String]) -> (&'static str, Value) {
    (KEY_BLOCKED_DOMAINS, Value::from(domains.to_vec()))
}

pub(crate) fn totp_secret_entry(secret: &str) -> (&'static str, Value) {
    (KEY_TOTP_SECRET, Value::String(secret.to_string()))
}

fn epoch_ms(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
