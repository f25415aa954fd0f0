//! Wire shapes of the request/response message facade.
//!
//! Requests look like `{"type": "startSession", "durationMinutes": 25}`.
//! Field values are read the way a loosely typed UI sends them: numeric
//! strings count as numbers and anything else reads as absent, so validation
//! happens in the session layer with its own error messages.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::events::Effect;
use crate::session::{AuthInfo, EarlyEnd, SessionState};

/// Every `type` the facade answers.
pub const KNOWN_TYPES: &[&str] = &[
    "getState",
    "startSession",
    "extendSession",
    "endSession",
    "updateDomains",
    "toggleAuth",
    "resetAuth",
    "getAuth",
    "setAutoTrigger",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    GetState,
    StartSession {
        #[serde(
            rename = "durationMinutes",
            default,
            deserialize_with = "lenient_minutes",
            skip_serializing_if = "Option::is_none"
        )]
        duration_minutes: Option<f64>,
    },
    ExtendSession {
        #[serde(
            rename = "additionalMinutes",
            default,
            deserialize_with = "lenient_minutes",
            skip_serializing_if = "Option::is_none"
        )]
        additional_minutes: Option<f64>,
    },
    /// Early end; `code` is only checked when auth is enabled.
    EndSession {
        #[serde(
            default,
            deserialize_with = "lenient_code",
            skip_serializing_if = "Option::is_none"
        )]
        code: Option<String>,
    },
    UpdateDomains {
        #[serde(default, deserialize_with = "lenient_string_list")]
        domains: Vec<String>,
    },
    ToggleAuth {
        #[serde(default, deserialize_with = "truthy")]
        enabled: bool,
    },
    ResetAuth,
    GetAuth,
    SetAutoTrigger {
        #[serde(default, deserialize_with = "truthy")]
        enabled: bool,
    },
}

impl Command {
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::GetState => "getState",
            Command::StartSession { .. } => "startSession",
            Command::ExtendSession { .. } => "extendSession",
            Command::EndSession { .. } => "endSession",
            Command::UpdateDomains { .. } => "updateDomains",
            Command::ToggleAuth { .. } => "toggleAuth",
            Command::ResetAuth => "resetAuth",
            Command::GetAuth => "getAuth",
            Command::SetAutoTrigger { .. } => "setAutoTrigger",
        }
    }
}

fn lenient_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Operation-specific body of a successful response, flattened next to `ok`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    State(SessionState),
    Deadline(SessionEnd),
    EarlyEnd(EarlyEnd),
    Domains(DomainList),
    Auth(AuthInfo),
    Secret(SecretReset),
    AutoTrigger(AutoTriggerState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnd {
    pub session_end: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainList {
    pub blocked_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretReset {
    pub secret: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTriggerState {
    pub auto_trigger_enabled: bool,
}

/// `{ok: true, ...payload}` or `{ok: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<Payload>,
    /// Host-side work requested by the operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl Response {
    pub fn success(payload: Payload) -> Self {
        Self {
            ok: true,
            error: None,
            payload: Some(payload),
            effects: Vec::new(),
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            payload: None,
            effects: Vec::new(),
        }
    }

    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "ok": false, "error": e.to_string() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Command {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_camel_case_requests() {
        assert_eq!(parse(json!({"type": "getState"})), Command::GetState);
        assert_eq!(
            parse(json!({"type": "startSession", "durationMinutes": 25})),
            Command::StartSession {
                duration_minutes: Some(25.0)
            }
        );
        assert_eq!(
            parse(json!({"type": "updateDomains", "domains": ["a.com", 3]})),
            Command::UpdateDomains {
                domains: vec!["a.com".to_string()]
            }
        );
    }

    #[test]
    fn loosely_typed_fields() {
        assert_eq!(
            parse(json!({"type": "extendSession", "additionalMinutes": "5"})),
            Command::ExtendSession {
                additional_minutes: Some(5.0)
            }
        );
        assert_eq!(
            parse(json!({"type": "startSession", "durationMinutes": "soon"})),
            Command::StartSession {
                duration_minutes: None
            }
        );
        assert_eq!(
            parse(json!({"type": "startSession"})),
            Command::StartSession {
                duration_minutes: None
            }
        );
        assert_eq!(
            parse(json!({"type": "endSession", "code": 123456})),
            Command::EndSession {
                code: Some("123456".to_string())
            }
        );
        assert_eq!(
            parse(json!({"type": "toggleAuth", "enabled": 1})),
            Command::ToggleAuth { enabled: true }
        );
        assert_eq!(
            parse(json!({"type": "setAutoTrigger"})),
            Command::SetAutoTrigger { enabled: false }
        );
    }

    #[test]
    fn known_types_cover_every_variant() {
        for command in [
            Command::GetState,
            Command::StartSession {
                duration_minutes: None,
            },
            Command::ExtendSession {
                additional_minutes: None,
            },
            Command::EndSession { code: None },
            Command::UpdateDomains { domains: vec![] },
            Command::ToggleAuth { enabled: true },
            Command::ResetAuth,
            Command::GetAuth,
            Command::SetAutoTrigger { enabled: true },
        ] {
            assert!(KNOWN_TYPES.contains(&command.type_name()));
            let wire = serde_json::to_value(&command).unwrap();
            assert_eq!(wire["type"], command.type_name());
        }
    }

    #[test]
    fn response_shapes() {
        let ok = Response::success(Payload::Deadline(SessionEnd { session_end: 42 }));
        assert_eq!(ok.to_json(), json!({"ok": true, "sessionEnd": 42}));

        let err = Response::failure("Invalid code");
        assert_eq!(err.to_json(), json!({"ok": false, "error": "Invalid code"}));
    }
}
