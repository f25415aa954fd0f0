//! Session lifecycle state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Inactive --start--> Active(deadline) --extend--> Active(deadline')
//! Active --end--> Inactive
//! Active --timer_fire(now >= deadline)--> Inactive
//! Active --timer_fire(now <  deadline)--> Active (reschedule)
//! ```
//!
//! Timers can fire late, early, or twice, so `timer_fire` checks the clock
//! instead of trusting that the deadline has arrived.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionPhase {
    Inactive,
    Active { deadline_ms: i64 },
}

/// What a wake-timer firing amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Fired before the deadline; schedule again for the same instant.
    Reschedule { deadline_ms: i64 },
    /// The deadline has passed; the session is over.
    Expired,
    /// Nothing was running. Rules and timer should still be cleared.
    Idle,
}

impl SessionPhase {
    /// Phase as seen by readers: active only while the deadline is in the future.
    pub fn at(deadline_ms: Option<i64>, now_ms: i64) -> Self {
        match deadline_ms {
            Some(deadline_ms) if deadline_ms > now_ms => SessionPhase::Active { deadline_ms },
            _ => SessionPhase::Inactive,
        }
    }

    /// Phase as stored, without comparing against the clock. Used when a
    /// timer fires so an overdue deadline shows up as `Expired`.
    pub fn stored(deadline_ms: Option<i64>) -> Self {
        match deadline_ms {
            Some(deadline_ms) => SessionPhase::Active { deadline_ms },
            None => SessionPhase::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Active { .. })
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        match self {
            SessionPhase::Active { deadline_ms } => Some(*deadline_ms),
            SessionPhase::Inactive => None,
        }
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.deadline_ms()
            .map(|deadline| (deadline - now_ms).max(0))
            .unwrap_or(0)
    }

    /// Begin a session of `duration_ms` from `now_ms`. A running session is
    /// replaced.
    pub fn start(self, now_ms: i64, duration_ms: i64) -> Result<Self> {
        if duration_ms <= 0 {
            return Err(CoreError::InvalidDuration { label: "Duration" });
        }
        Ok(SessionPhase::Active {
            deadline_ms: now_ms.saturating_add(duration_ms),
        })
    }

    /// Push the deadline back by `extra_ms`.
    pub fn extend(self, extra_ms: i64) -> Result<Self> {
        if extra_ms <= 0 {
            return Err(CoreError::InvalidDuration {
                label: "Additional minutes",
            });
        }
        match self {
            SessionPhase::Active { deadline_ms } => Ok(SessionPhase::Active {
                deadline_ms: deadline_ms.saturating_add(extra_ms),
            }),
            SessionPhase::Inactive => Err(CoreError::NoActiveSession),
        }
    }

    pub fn end(self) -> Self {
        SessionPhase::Inactive
    }

    pub fn timer_fire(self, now_ms: i64) -> (Self, TimerOutcome) {
        match self {
            SessionPhase::Active { deadline_ms } if now_ms < deadline_ms => {
                (self, TimerOutcome::Reschedule { deadline_ms })
            }
            SessionPhase::Active { .. } => (SessionPhase::Inactive, TimerOutcome::Expired),
            SessionPhase::Inactive => (SessionPhase::Inactive, TimerOutcome::Idle),
        }
    }
}

/// Convert a user-supplied minute count to milliseconds.
///
/// Absent, non-finite, zero and negative values are rejected with
/// `InvalidDuration` carrying `label`.
pub fn minutes_to_ms(minutes: Option<f64>, label: &'static str) -> Result<i64> {
    match minutes {
        Some(m) if m.is_finite() && m > 0.0 => {
            let ms = (m * MS_PER_MINUTE).round();
            if ms >= 1.0 && ms < i64::MAX as f64 {
                Ok(ms as i64)
            } else {
                Err(CoreError::InvalidDuration { label })
            }
        }
        _ => Err(CoreError::InvalidDuration { label }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_at_requires_future_deadline() {
        assert_eq!(SessionPhase::at(None, 100), SessionPhase::Inactive);
        assert_eq!(SessionPhase::at(Some(100), 100), SessionPhase::Inactive);
        assert_eq!(
            SessionPhase::at(Some(101), 100),
            SessionPhase::Active { deadline_ms: 101 }
        );
    }

    #[test]
    fn start_then_extend_accumulates() {
        let phase = SessionPhase::Inactive.start(1_000, 600_000).unwrap();
        let phase = phase.extend(300_000).unwrap();
        assert_eq!(phase.deadline_ms(), Some(901_000));
        assert_eq!(phase.remaining_ms(1_000), 900_000);
    }

    #[test]
    fn extend_requires_active_session() {
        assert!(matches!(
            SessionPhase::Inactive.extend(1),
            Err(CoreError::NoActiveSession)
        ));
    }

    #[test]
    fn end_clears_any_deadline() {
        let ended = SessionPhase::stored(Some(5_000)).end();
        assert_eq!(ended, SessionPhase::Inactive);
        assert_eq!(ended.deadline_ms(), None);
        assert_eq!(SessionPhase::Inactive.end(), SessionPhase::Inactive);
    }

    #[test]
    fn invalid_durations_are_rejected_before_state_checks() {
        assert!(matches!(
            SessionPhase::Inactive.extend(0),
            Err(CoreError::InvalidDuration { .. })
        ));
        assert!(matches!(
            SessionPhase::Inactive.start(0, -5),
            Err(CoreError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn early_timer_reschedules() {
        let phase = SessionPhase::Active { deadline_ms: 5_000 };
        let (next, outcome) = phase.timer_fire(4_999);
        assert_eq!(next, phase);
        assert_eq!(outcome, TimerOutcome::Reschedule { deadline_ms: 5_000 });
    }

    #[test]
    fn late_timer_expires() {
        let (next, outcome) = SessionPhase::Active { deadline_ms: 5_000 }.timer_fire(5_000);
        assert_eq!(next, SessionPhase::Inactive);
        assert_eq!(outcome, TimerOutcome::Expired);
        let (_, outcome) = SessionPhase::Active { deadline_ms: 5_000 }.timer_fire(90_000);
        assert_eq!(outcome, TimerOutcome::Expired);
    }

    #[test]
    fn timer_without_session_is_idle() {
        assert_eq!(
            SessionPhase::Inactive.timer_fire(1).1,
            TimerOutcome::Idle
        );
    }

    #[test]
    fn minutes_conversion() {
        assert_eq!(minutes_to_ms(Some(25.0), "Duration").unwrap(), 1_500_000);
        assert_eq!(minutes_to_ms(Some(0.5), "Duration").unwrap(), 30_000);
        for bad in [None, Some(0.0), Some(-3.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let err = minutes_to_ms(bad, "Duration").unwrap_err();
            assert_eq!(err.to_string(), "Duration must be greater than 0");
        }
    }
}
