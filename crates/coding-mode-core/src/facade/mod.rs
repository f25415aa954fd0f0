//! Request/response facade over the session manager.
//!
//! Every inbound message is answered; failures become
//! `{"ok": false, "error": "..."}` and never escape as a panic or `Err`.

mod command;
mod lifecycle;

pub use command::{
    AutoTriggerState, Command, DomainList, Payload, Response, SecretReset, SessionEnd, KNOWN_TYPES,
};
pub use lifecycle::PlatformEvent;

use serde_json::Value;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::policy::{RuleEngine, WakeTimer};
use crate::session::SessionManager;
use crate::storage::{Config, Store};

pub struct Facade<S, R, W, C> {
    manager: SessionManager<S, R, W, C>,
}

impl<S, R, W, C> Facade<S, R, W, C>
where
    S: Store,
    R: RuleEngine,
    W: WakeTimer,
    C: Clock,
{
    pub fn new(store: S, rules: R, timer: W, clock: C, config: Config) -> Self {
        Self {
            manager: SessionManager::new(store, rules, timer, clock, config),
        }
    }

    pub fn manager(&self) -> &SessionManager<S, R, W, C> {
        &self.manager
    }

    /// Answer a typed command.
    pub fn dispatch(&self, command: Command) -> Response {
        let kind = command.type_name();
        match self.execute(command) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(kind, error = %e, "message failed");
                Response::failure(e)
            }
        }
    }

    /// Answer a raw JSON message.
    pub fn dispatch_json(&self, raw: &str) -> Response {
        match parse_command(raw) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                tracing::warn!(error = %e, "rejected message");
                Response::failure(e)
            }
        }
    }

    fn execute(&self, command: Command) -> Result<Response> {
        let manager = &self.manager;
        let response = match command {
            Command::GetState => Response::success(Payload::State(manager.get_state()?)),
            Command::StartSession { duration_minutes } => {
                let started = manager.start_session(duration_minutes)?;
                Response::success(Payload::Deadline(SessionEnd {
                    session_end: started.value,
                }))
                .with_effects(started.effects)
            }
            Command::ExtendSession { additional_minutes } => {
                let extended = manager.extend_session(additional_minutes)?;
                Response::success(Payload::Deadline(SessionEnd {
                    session_end: extended.value,
                }))
            }
            Command::EndSession { code } => {
                let outcome = manager.end_session_with_auth(code.as_deref())?;
                Response::success(Payload::EarlyEnd(outcome.value)).with_effects(outcome.effects)
            }
            Command::UpdateDomains { domains } => {
                let blocked_domains = manager.update_domains(&domains)?;
                Response::success(Payload::Domains(DomainList { blocked_domains }))
            }
            Command::ToggleAuth { enabled } => {
                Response::success(Payload::Auth(manager.toggle_auth(enabled)?))
            }
            Command::ResetAuth => {
                let secret = manager.reset_secret()?;
                let uri = manager.otpauth_uri(&secret);
                Response::success(Payload::Secret(SecretReset { secret, uri }))
            }
            Command::GetAuth => Response::success(Payload::Auth(manager.auth_info()?)),
            Command::SetAutoTrigger { enabled } => {
                let auto_trigger_enabled = manager.set_auto_trigger(enabled)?;
                Response::success(Payload::AutoTrigger(AutoTriggerState {
                    auto_trigger_enabled,
                }))
            }
        };
        Ok(response)
    }
}

/// Parse a raw message, telling an unknown `type` apart from a malformed body.
pub fn parse_command(raw: &str) -> Result<Command> {
    let value: Value = serde_json::from_str(raw)?;
    let known = value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| KNOWN_TYPES.contains(&kind));
    if !known {
        return Err(CoreError::UnknownMessage);
    }
    Ok(serde_json::from_value(value)?)
}
