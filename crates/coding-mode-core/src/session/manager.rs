//! Session state manager.
//!
//! Owns every read-modify-write of the [`SessionRecord`]. Each operation
//! validates first, then writes all affected fields in a single store call,
//! then reconciles blocking rules and the wake-timer from the new record.

use serde::{Deserialize, Serialize};

use super::machine::{minutes_to_ms, SessionPhase, TimerOutcome};
use super::record::{
    blocked_domains_entry, session_end_entry, totp_secret_entry, SessionRecord, KEY_AUTH_ENABLED,
    KEY_AUTO_TRIGGER_ENABLED,
};
use crate::clock::Clock;
use crate::domains;
use crate::error::{CoreError, Result};
use crate::events::Effect;
use crate::policy::{PolicyEnforcer, RuleEngine, WakeTimer};
use crate::storage::{Config, Store};
use crate::totp;

/// Snapshot returned by [`SessionManager::get_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub active: bool,
    pub remaining_ms: i64,
    /// Deadline of the running session; `None` when inactive.
    pub session_end: Option<i64>,
    pub auth_enabled: bool,
    pub totp_secret: Option<String>,
    pub blocked_domains: Vec<String>,
    pub auto_trigger_enabled: bool,
}

/// Result of an early-end attempt. A wrong code is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyEnd {
    pub ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EarlyEnd {
    fn ended() -> Self {
        Self {
            ended: true,
            error: None,
        }
    }

    fn refused(reason: CoreError) -> Self {
        Self {
            ended: false,
            error: Some(reason.to_string()),
        }
    }
}

/// Authenticator provisioning data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub auth_enabled: bool,
    pub secret: Option<String>,
    /// `otpauth://` URI for the secret, when one exists.
    pub uri: Option<String>,
}

/// Value of a transition plus the host-side effects it requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<T> {
    pub value: T,
    pub effects: Vec<Effect>,
}

impl<T> Transition<T> {
    fn pure(value: T) -> Self {
        Self {
            value,
            effects: Vec::new(),
        }
    }

    fn with_effects(value: T, effects: Vec<Effect>) -> Self {
        Self { value, effects }
    }
}

pub struct SessionManager<S, R, W, C> {
    store: S,
    enforcer: PolicyEnforcer<R, W>,
    clock: C,
    config: Config,
    seed: Vec<String>,
}

impl<S, R, W, C> SessionManager<S, R, W, C>
where
    S: Store,
    R: RuleEngine,
    W: WakeTimer,
    C: Clock,
{
    pub fn new(store: S, rules: R, timer: W, clock: C, config: Config) -> Self {
        let seed = config.seed_domains();
        let enforcer = PolicyEnforcer::new(rules, timer, config.blocking.clone());
        Self {
            store,
            enforcer,
            clock,
            config,
            seed,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn enforcer(&self) -> &PolicyEnforcer<R, W> {
        &self.enforcer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Bootstrap missing fields and merge the seed list, then load the record.
    fn record(&self) -> Result<SessionRecord> {
        SessionRecord::ensure_defaults(&self.store, &self.seed)?;
        Ok(SessionRecord::load(&self.store)?)
    }

    /// The single source of truth for whether a session is running.
    pub fn get_state(&self) -> Result<SessionState> {
        let record = self.record()?;
        let now = self.now();
        let phase = SessionPhase::at(record.session_end, now);
        Ok(SessionState {
            active: phase.is_active(),
            remaining_ms: phase.remaining_ms(now),
            session_end: phase.deadline_ms(),
            auth_enabled: record.auth_enabled,
            totp_secret: record.totp_secret,
            blocked_domains: record.blocked_domains,
            auto_trigger_enabled: record.auto_trigger_enabled,
        })
    }

    /// Start (or restart) a session lasting `duration_minutes`.
    pub fn start_session(&self, duration_minutes: Option<f64>) -> Result<Transition<i64>> {
        let duration_ms = minutes_to_ms(duration_minutes, "Duration")?;
        let record = self.record()?;
        if record.blocked_domains.is_empty() {
            return Err(CoreError::NoDomainsConfigured);
        }

        let now = self.now();
        let phase = SessionPhase::at(record.session_end, now).start(now, duration_ms)?;
        let deadline = phase.deadline_ms().unwrap_or(now);

        self.store.set_many(&[session_end_entry(Some(deadline))])?;
        self.enforcer.reconcile(&record.blocked_domains)?;
        self.enforcer.schedule_wake(Some(deadline), now)?;
        tracing::info!(
            session_end = deadline,
            domains = record.blocked_domains.len(),
            "session started"
        );

        let effects = Effect::reload_matching(&record.blocked_domains)
            .into_iter()
            .collect();
        Ok(Transition::with_effects(deadline, effects))
    }

    /// Push the running session's deadline back. Rules are left alone.
    pub fn extend_session(&self, additional_minutes: Option<f64>) -> Result<Transition<i64>> {
        let extra_ms = minutes_to_ms(additional_minutes, "Additional minutes")?;
        let record = self.record()?;
        let now = self.now();
        let phase = SessionPhase::at(record.session_end, now).extend(extra_ms)?;
        let deadline = phase.deadline_ms().unwrap_or(now);

        self.store.set_many(&[session_end_entry(Some(deadline))])?;
        self.enforcer.schedule_wake(Some(deadline), now)?;
        tracing::info!(session_end = deadline, "session extended");
        Ok(Transition::pure(deadline))
    }

    /// Clear the deadline, all rules and the wake-timer. Safe to repeat.
    pub fn end_session(&self) -> Result<Transition<()>> {
        let record = self.record()?;
        let phase = SessionPhase::stored(record.session_end).end();

        self.store.set_many(&[session_end_entry(phase.deadline_ms())])?;
        self.enforcer.clear_rules()?;
        self.enforcer.schedule_wake(phase.deadline_ms(), self.now())?;
        if let Some(deadline) = record.session_end {
            tracing::info!(session_end = deadline, "session ended");
        }

        let effects = Effect::reload_matching(&record.blocked_domains)
            .into_iter()
            .collect();
        Ok(Transition::with_effects((), effects))
    }

    /// End early, gated by a TOTP code when auth is on.
    pub fn end_session_with_auth(&self, code: Option<&str>) -> Result<Transition<EarlyEnd>> {
        let state = self.get_state()?;
        if !state.active {
            return Ok(Transition::pure(EarlyEnd::ended()));
        }

        if state.auth_enabled {
            let Some(secret) = state.totp_secret.as_deref() else {
                return Ok(Transition::pure(EarlyEnd::refused(
                    CoreError::AuthenticatorNotConfigured,
                )));
            };
            let params = self.config.auth.totp_params();
            if !totp::verify_totp(secret, code.unwrap_or_default(), self.now(), &params) {
                tracing::warn!("early end refused: invalid code");
                return Ok(Transition::pure(EarlyEnd::refused(CoreError::InvalidCode)));
            }
        }

        let ended = self.end_session()?;
        Ok(Transition::with_effects(EarlyEnd::ended(), ended.effects))
    }

    /// Replace the block list. A running session picks up the change at once.
    pub fn update_domains<I, T>(&self, raw: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let sanitized = domains::sanitize(raw);
        self.store.set_many(&[blocked_domains_entry(&sanitized)])?;
        let state = self.get_state()?;
        if state.active {
            self.enforcer.reconcile(&state.blocked_domains)?;
        }
        tracing::info!(count = sanitized.len(), "blocked domains updated");
        Ok(sanitized)
    }

    /// Turn the TOTP gate on or off. Enabling creates a secret if none exists;
    /// disabling keeps the secret so re-enabling needs no re-provisioning.
    pub fn toggle_auth(&self, enabled: bool) -> Result<AuthInfo> {
        let record = self.record()?;
        let mut updates = vec![(KEY_AUTH_ENABLED, serde_json::Value::Bool(enabled))];

        let secret = match record.totp_secret {
            Some(secret) => Some(secret),
            None if enabled => {
                let fresh = self.new_secret()?;
                updates.push(totp_secret_entry(&fresh));
                Some(fresh)
            }
            None => None,
        };
        self.store.set_many(&updates)?;
        tracing::info!(enabled, "authenticator gate toggled");

        Ok(AuthInfo {
            auth_enabled: enabled,
            uri: secret.as_deref().map(|s| self.otpauth_uri(s)),
            secret,
        })
    }

    /// Provisioning data, creating the secret on first request.
    pub fn auth_info(&self) -> Result<AuthInfo> {
        let record = self.record()?;
        let secret = match record.totp_secret {
            Some(secret) => secret,
            None => {
                let fresh = self.new_secret()?;
                self.store.set_many(&[totp_secret_entry(&fresh)])?;
                fresh
            }
        };
        Ok(AuthInfo {
            auth_enabled: record.auth_enabled,
            uri: Some(self.otpauth_uri(&secret)),
            secret: Some(secret),
        })
    }

    /// Replace the secret unconditionally. Authenticators must be rescanned.
    pub fn reset_secret(&self) -> Result<String> {
        self.record()?;
        let secret = self.new_secret()?;
        self.store.set_many(&[totp_secret_entry(&secret)])?;
        tracing::info!("authenticator secret reset");
        Ok(secret)
    }

    pub fn set_auto_trigger(&self, enabled: bool) -> Result<bool> {
        self.record()?;
        self.store
            .set_many(&[(KEY_AUTO_TRIGGER_ENABLED, serde_json::Value::Bool(enabled))])?;
        Ok(enabled)
    }

    pub fn otpauth_uri(&self, secret: &str) -> String {
        totp::build_otpauth_uri_with(
            secret,
            &self.config.auth.label,
            &self.config.auth.issuer,
            &self.config.auth.totp_params(),
        )
    }

    fn new_secret(&self) -> Result<String> {
        totp::generate_secret(self.config.auth.secret_bytes)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Install/update: bootstrap and report the merged block list.
    pub fn install_defaults(&self) -> Result<Vec<String>> {
        Ok(self.record()?.blocked_domains)
    }

    /// Process start: rebuild rules and timer from the record alone.
    pub fn restore(&self) -> Result<Transition<bool>> {
        let state = self.get_state()?;
        if state.active {
            self.enforcer.reconcile(&state.blocked_domains)?;
            self.enforcer.schedule_wake(state.session_end, self.now())?;
            tracing::info!(session_end = ?state.session_end, "session restored");
            return Ok(Transition::pure(true));
        }
        let ended = self.end_session()?;
        Ok(Transition::with_effects(false, ended.effects))
    }

    /// The session wake-timer fired. Re-checks the clock before ending.
    pub fn timer_fired(&self) -> Result<Transition<TimerOutcome>> {
        let record = self.record()?;
        let now = self.now();
        let (_, outcome) = SessionPhase::stored(record.session_end).timer_fire(now);
        match outcome {
            TimerOutcome::Reschedule { deadline_ms } => {
                tracing::debug!(deadline_ms, now, "wake-timer fired early, rescheduling");
                self.enforcer.schedule_wake(Some(deadline_ms), now)?;
                Ok(Transition::pure(outcome))
            }
            TimerOutcome::Expired | TimerOutcome::Idle => {
                let ended = self.end_session()?;
                Ok(Transition::with_effects(outcome, ended.effects))
            }
        }
    }

    /// Start a session when a top-frame navigation lands on a coding site.
    /// Returns `None` when the navigation does not qualify.
    pub fn auto_trigger(&self, url: &str, is_top_frame: bool) -> Result<Option<Transition<i64>>> {
        if !is_top_frame {
            return Ok(None);
        }
        let state = self.get_state()?;
        if !state.auto_trigger_enabled || state.active {
            return Ok(None);
        }
        let Some(host) = domains::host_of_url(url) else {
            return Ok(None);
        };
        if !self
            .config
            .session
            .auto_trigger_sites
            .iter()
            .any(|site| site.eq_ignore_ascii_case(&host))
        {
            return Ok(None);
        }

        let started = self.start_session(Some(self.config.session.auto_trigger_minutes))?;
        tracing::info!(
            host = %host,
            minutes = self.config.session.auto_trigger_minutes,
            "auto-triggered session"
        );
        Ok(Some(started))
    }
}
