//! Integration tests for the session lifecycle.
//!
//! These run the manager against in-memory platform services and a manual
//! clock, covering start/extend/end, the TOTP gate, live domain updates and
//! recovery after restarts and misbehaving timers.

use coding_mode_core::policy::{MemoryRuleEngine, MemoryWakeTimer, RuleEngine, WakeTimer};
use coding_mode_core::session::{
    SessionManager, TimerOutcome, KEY_AUTH_ENABLED, KEY_BLOCKED_DOMAINS, KEY_SESSION_END,
};
use coding_mode_core::storage::{Config, MemoryStore, Store};
use coding_mode_core::totp::{self, TotpParams};
use coding_mode_core::{Clock, CoreError, Effect, ManualClock};

const T0: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;
const ALARM: &str = "coding-mode-session";

type Manager<'a> =
    SessionManager<&'a MemoryStore, &'a MemoryRuleEngine, &'a MemoryWakeTimer, &'a ManualClock>;

struct Platform {
    store: MemoryStore,
    rules: MemoryRuleEngine,
    timer: MemoryWakeTimer,
    clock: ManualClock,
}

impl Platform {
    fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            rules: MemoryRuleEngine::new(),
            timer: MemoryWakeTimer::new(),
            clock: ManualClock::new(T0),
        }
    }

    fn manager_with(&self, seed: &[&str]) -> Manager<'_> {
        let config = Config {
            default_domains: Some(seed.iter().map(|s| s.to_string()).collect()),
            ..Config::default()
        };
        SessionManager::new(&self.store, &self.rules, &self.timer, &self.clock, config)
    }

    fn manager(&self) -> Manager<'_> {
        self.manager_with(&["reddit.com", "youtube.com"])
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn rule_domains(&self) -> Vec<String> {
        self.rules
            .dynamic_rules()
            .unwrap()
            .iter()
            .map(|r| r.domain().to_string())
            .collect()
    }
}

#[test]
fn test_start_session_blocks_and_schedules() {
    let p = Platform::new();
    let m = p.manager();

    let started = m.start_session(Some(25.0)).unwrap();
    assert_eq!(started.value, T0 + 25 * MINUTE);
    assert_eq!(
        started.effects,
        vec![Effect::ReloadMatchingTabs {
            domains: vec!["reddit.com".to_string(), "youtube.com".to_string()]
        }]
    );

    let state = m.get_state().unwrap();
    assert!(state.active);
    assert_eq!(state.remaining_ms, 25 * MINUTE);
    assert_eq!(state.session_end, Some(T0 + 25 * MINUTE));
    assert_eq!(p.rule_domains(), vec!["reddit.com", "youtube.com"]);
    assert_eq!(p.timer.scheduled(ALARM).unwrap(), Some(T0 + 25 * MINUTE));
}

#[test]
fn test_start_with_zero_duration_fails_without_writing() {
    let p = Platform::new();
    let m = p.manager();
    m.get_state().unwrap();
    let before = p.store.snapshot();

    for bad in [Some(0.0), Some(-5.0), None, Some(f64::NAN)] {
        let err = m.start_session(bad).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDuration { .. }));
    }
    assert_eq!(p.store.snapshot(), before);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
    assert!(p.timer.is_empty());
}

#[test]
fn test_start_with_empty_domain_list_fails() {
    let p = Platform::new();
    let m = p.manager_with(&[]);

    let err = m.start_session(Some(25.0)).unwrap_err();
    assert!(matches!(err, CoreError::NoDomainsConfigured));
    assert_eq!(err.to_string(), "No blocked domains configured");
    assert!(!m.get_state().unwrap().active);
}

#[test]
fn test_extend_adds_exactly_and_keeps_one_rule_set() {
    let p = Platform::new();
    let m = p.manager();

    let start = m.start_session(Some(10.0)).unwrap().value;
    p.clock.advance_minutes(3);
    let extended = m.extend_session(Some(5.0)).unwrap();

    assert_eq!(extended.value, start + 5 * MINUTE);
    assert_eq!(extended.value, T0 + 15 * MINUTE);
    assert!(extended.effects.is_empty());
    assert_eq!(p.rules.dynamic_rules().unwrap().len(), 2);
    assert_eq!(p.rules.update_count(), 1);
    assert_eq!(p.timer.scheduled(ALARM).unwrap(), Some(T0 + 15 * MINUTE));
    assert_eq!(p.timer.len(), 1);
}

#[test]
fn test_extend_requires_running_session() {
    let p = Platform::new();
    let m = p.manager();

    assert!(matches!(
        m.extend_session(Some(5.0)),
        Err(CoreError::NoActiveSession)
    ));
    assert!(matches!(
        m.extend_session(Some(0.0)),
        Err(CoreError::InvalidDuration {
            label: "Additional minutes"
        })
    ));

    m.start_session(Some(1.0)).unwrap();
    p.clock.advance_minutes(2);
    assert!(matches!(
        m.extend_session(Some(5.0)),
        Err(CoreError::NoActiveSession)
    ));
}

#[test]
fn test_end_session_is_idempotent() {
    let p = Platform::new();
    let m = p.manager();
    m.start_session(Some(25.0)).unwrap();

    let ended = m.end_session().unwrap();
    assert_eq!(ended.effects.len(), 1);
    assert!(!m.get_state().unwrap().active);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
    assert!(p.timer.is_empty());

    m.end_session().unwrap();
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
    assert_eq!(p.store.get(KEY_SESSION_END).unwrap(), Some(serde_json::Value::Null));
}

#[test]
fn test_auth_gate_scenario() {
    let p = Platform::new();
    let m = p.manager();

    let auth = m.toggle_auth(true).unwrap();
    assert!(auth.auth_enabled);
    let secret = auth.secret.clone().unwrap();
    assert!(auth.uri.unwrap().starts_with("otpauth://totp/"));
    assert_eq!(m.get_state().unwrap().totp_secret.as_deref(), Some(secret.as_str()));

    m.start_session(Some(25.0)).unwrap();
    p.clock.advance_ms(90_000);

    let params = TotpParams::default();
    let accepted: Vec<String> = (-1..=1)
        .map(|offset| totp::generate_totp(&secret, p.now(), &params, offset).unwrap())
        .collect();
    let wrong = ["000000", "111111", "222222", "333333"]
        .into_iter()
        .find(|code| !accepted.iter().any(|a| a == code))
        .unwrap();

    let refused = m.end_session_with_auth(Some(wrong)).unwrap();
    assert!(!refused.value.ended);
    assert_eq!(refused.value.error.as_deref(), Some("Invalid code"));
    assert!(refused.effects.is_empty());
    assert!(m.get_state().unwrap().active);
    assert_eq!(p.rule_domains().len(), 2);

    let correct = &accepted[1];
    let ended = m.end_session_with_auth(Some(correct.as_str())).unwrap();
    assert!(ended.value.ended);
    assert_eq!(ended.value.error, None);
    assert!(!m.get_state().unwrap().active);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
}

#[test]
fn test_end_with_auth_when_inactive_or_disabled() {
    let p = Platform::new();
    let m = p.manager();

    let nothing_running = m.end_session_with_auth(None).unwrap();
    assert!(nothing_running.value.ended);

    m.start_session(Some(25.0)).unwrap();
    let no_gate = m.end_session_with_auth(None).unwrap();
    assert!(no_gate.value.ended);
    assert!(!m.get_state().unwrap().active);
}

#[test]
fn test_end_with_auth_without_secret() {
    let p = Platform::new();
    let m = p.manager();
    m.start_session(Some(25.0)).unwrap();
    p.store
        .set(KEY_AUTH_ENABLED, serde_json::json!(true))
        .unwrap();

    let refused = m.end_session_with_auth(Some("123456")).unwrap();
    assert!(!refused.value.ended);
    assert_eq!(refused.value.error.as_deref(), Some("Authenticator not set"));
    assert!(m.get_state().unwrap().active);
}

#[test]
fn test_disabling_auth_keeps_secret() {
    let p = Platform::new();
    let m = p.manager();

    let first = m.toggle_auth(true).unwrap().secret;
    let disabled = m.toggle_auth(false).unwrap();
    assert!(!disabled.auth_enabled);
    assert_eq!(disabled.secret, first);
    assert_eq!(m.toggle_auth(true).unwrap().secret, first);

    let fresh = m.reset_secret().unwrap();
    assert_ne!(Some(fresh.clone()), first);
    assert_eq!(m.get_state().unwrap().totp_secret, Some(fresh));
}

#[test]
fn test_get_auth_creates_secret_once() {
    let p = Platform::new();
    let m = p.manager();

    let info = m.auth_info().unwrap();
    assert!(!info.auth_enabled);
    let secret = info.secret.unwrap();
    assert_eq!(secret.len(), 32);
    assert_eq!(m.auth_info().unwrap().secret, Some(secret));
}

#[test]
fn test_update_domains_applies_live() {
    let p = Platform::new();
    let m = p.manager_with(&[]);

    let idle = m
        .update_domains(["https://News.YCombinator.com/", "x.com", "x.com"])
        .unwrap();
    assert_eq!(idle, vec!["news.ycombinator.com", "x.com"]);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());

    m.start_session(Some(25.0)).unwrap();
    assert_eq!(p.rule_domains(), vec!["news.ycombinator.com", "x.com"]);

    m.update_domains(["twitch.tv"]).unwrap();
    assert_eq!(p.rule_domains(), vec!["twitch.tv"]);
    let ids: Vec<u32> = p.rules.dynamic_rules().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn test_restart_rebuilds_derived_state() {
    let p = Platform::new();
    p.manager().start_session(Some(25.0)).unwrap();

    // A fresh host: rules and alarms are gone, the record survived.
    let rules = MemoryRuleEngine::new();
    let timer = MemoryWakeTimer::new();
    let m = SessionManager::new(&p.store, &rules, &timer, &p.clock, Config::default());
    p.clock.advance_minutes(5);

    assert!(m.restore().unwrap().value);
    assert_eq!(rules.dynamic_rules().unwrap().len(), 2);
    assert_eq!(timer.scheduled(ALARM).unwrap(), Some(T0 + 25 * MINUTE));
}

#[test]
fn test_restart_after_deadline_cleans_up() {
    let p = Platform::new();
    let m = p.manager();
    m.start_session(Some(25.0)).unwrap();
    p.clock.advance_minutes(40);

    let restored = m.restore().unwrap();
    assert!(!restored.value);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
    assert!(p.timer.is_empty());
    assert_eq!(p.store.get(KEY_SESSION_END).unwrap(), Some(serde_json::Value::Null));
}

#[test]
fn test_early_timer_reschedules_late_timer_ends() {
    let p = Platform::new();
    let m = p.manager();
    m.start_session(Some(10.0)).unwrap();

    p.clock.advance_minutes(9);
    let early = m.timer_fired().unwrap();
    assert_eq!(
        early.value,
        TimerOutcome::Reschedule {
            deadline_ms: T0 + 10 * MINUTE
        }
    );
    assert!(m.get_state().unwrap().active);
    assert_eq!(p.timer.scheduled(ALARM).unwrap(), Some(T0 + 10 * MINUTE));

    p.clock.advance_minutes(30);
    let late = m.timer_fired().unwrap();
    assert_eq!(late.value, TimerOutcome::Expired);
    assert_eq!(late.effects.len(), 1);
    assert!(p.rules.dynamic_rules().unwrap().is_empty());

    let again = m.timer_fired().unwrap();
    assert_eq!(again.value, TimerOutcome::Idle);
}

#[test]
fn test_auto_trigger_on_coding_site() {
    let p = Platform::new();
    let m = p.manager();

    let started = m
        .auto_trigger("https://leetcode.com/problems/two-sum/", true)
        .unwrap()
        .unwrap();
    assert_eq!(started.value, T0 + 30 * MINUTE);

    // Already running: no restart.
    p.clock.advance_minutes(1);
    assert!(m.auto_trigger("https://leetcode.com/", true).unwrap().is_none());
}

#[test]
fn test_auto_trigger_skips_when_disabled_or_unrelated() {
    let p = Platform::new();
    let m = p.manager();

    assert!(m.auto_trigger("https://example.com/", true).unwrap().is_none());
    assert!(m.auto_trigger("https://leetcode.com/", false).unwrap().is_none());
    assert!(m.auto_trigger("not a url", true).unwrap().is_none());

    m.set_auto_trigger(false).unwrap();
    assert!(!m.get_state().unwrap().auto_trigger_enabled);
    assert!(m.auto_trigger("https://leetcode.com/", true).unwrap().is_none());
    assert!(!m.get_state().unwrap().active);
}

#[test]
fn test_get_state_merges_seed_into_stored_list() {
    let p = Platform::new();
    p.store
        .set(KEY_BLOCKED_DOMAINS, serde_json::json!(["example.org"]))
        .unwrap();

    let state = p.manager_with(&["reddit.com"]).get_state().unwrap();
    assert_eq!(state.blocked_domains, vec!["example.org", "reddit.com"]);
    assert_eq!(
        p.store.get(KEY_BLOCKED_DOMAINS).unwrap(),
        Some(serde_json::json!(["example.org", "reddit.com"]))
    );

    let grown = p
        .manager_with(&["reddit.com", "youtube.com"])
        .install_defaults()
        .unwrap();
    assert_eq!(grown, vec!["example.org", "reddit.com", "youtube.com"]);
}

#[test]
fn test_seed_domains_stay_blocked_after_edit() {
    let p = Platform::new();
    let m = p.manager_with(&["reddit.com"]);
    m.start_session(Some(25.0)).unwrap();

    assert_eq!(m.update_domains(["twitch.tv"]).unwrap(), vec!["twitch.tv"]);
    assert_eq!(p.rule_domains(), vec!["twitch.tv", "reddit.com"]);
    assert_eq!(m.get_state().unwrap().blocked_domains, vec!["twitch.tv", "reddit.com"]);
}

#[test]
fn test_storage_failure_surfaces_as_error() {
    let p = Platform::new();
    let m = p.manager();
    m.get_state().unwrap();
    p.store.set_unavailable(true);

    assert!(matches!(m.get_state(), Err(CoreError::Storage(_))));
    assert!(matches!(
        m.start_session(Some(25.0)),
        Err(CoreError::Storage(_))
    ));
    assert!(p.rules.dynamic_rules().unwrap().is_empty());
}
