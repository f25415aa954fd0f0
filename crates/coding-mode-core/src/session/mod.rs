//! Focus session lifecycle: the persisted record, the phase machine and the
//! manager that ties them to storage and policy.

mod display;
mod machine;
mod manager;
mod record;

pub use display::{format_countdown, format_minutes_left};
pub use machine::{minutes_to_ms, SessionPhase, TimerOutcome};
pub use manager::{AuthInfo, EarlyEnd, SessionManager, SessionState, Transition};
pub use record::{
    SessionRecord, ALL_KEYS, KEY_AUTH_ENABLED, KEY_AUTO_TRIGGER_ENABLED, KEY_BLOCKED_DOMAINS,
    KEY_SESSION_END, KEY_TOTP_SECRET,
};
