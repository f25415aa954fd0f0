//! # Coding Mode Core Library
//!
//! The session and authentication engine behind Coding Mode, a self-imposed
//! distraction blocker. A session blocks a list of domains until a deadline;
//! ending it early can be gated behind a TOTP code from an authenticator app.
//!
//! The engine never runs in the background. Every entry point loads the
//! persisted [`SessionRecord`], derives what it needs from it and the clock,
//! and writes back. Blocking rules and the wake-timer are derived state that
//! [`PolicyEnforcer`] rebuilds from the record whenever it changes.
//!
//! ## Architecture
//!
//! - **Codecs**: [`base32`] and [`totp`] (RFC 4226 / RFC 6238)
//! - **Domains**: [`domains::sanitize`] turns user input into hostnames
//! - **Session**: [`SessionManager`] owns every transition of the record
//! - **Policy**: [`PolicyEnforcer`] drives a [`RuleEngine`] and [`WakeTimer`]
//! - **Facade**: [`Facade`] answers JSON messages and platform events
//! - **Storage**: [`Store`] implementations plus TOML [`Config`]
//!
//! Platform services are traits so the same engine runs against in-memory
//! fakes in tests and SQLite tables in the CLI.

pub mod base32;
pub mod clock;
pub mod domains;
pub mod error;
pub mod events;
pub mod facade;
pub mod policy;
pub mod session;
pub mod storage;
pub mod totp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, PolicyError, Result, StorageError};
pub use events::Effect;
pub use facade::{Command, Facade, PlatformEvent, Response};
pub use policy::{BlockRule, MemoryRuleEngine, MemoryWakeTimer, PolicyEnforcer, RuleEngine, WakeTimer};
pub use session::{SessionManager, SessionPhase, SessionRecord, SessionState};
pub use storage::{Config, Database, MemoryStore, Store};
