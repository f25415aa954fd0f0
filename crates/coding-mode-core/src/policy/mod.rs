//! Blocking policy: declarative rules, the session wake-timer, and the
//! enforcer that derives both from the session record.

mod enforcer;
mod rules;
mod timer;

pub use enforcer::PolicyEnforcer;
pub use rules::{BlockRule, MemoryRuleEngine, ResourceType, RuleAction, RuleCondition, RuleEngine};
pub use timer::{MemoryWakeTimer, WakeTimer};
