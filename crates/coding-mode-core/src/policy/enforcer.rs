//! Reconciles the platform's blocking rules and wake-timer with the session record.
//!
//! Both are derived state: every call here rebuilds them from the inputs
//! alone, so repeated or out-of-order calls converge on the same result.

use super::rules::{BlockRule, RuleEngine};
use super::timer::WakeTimer;
use crate::domains;
use crate::error::PolicyError;
use crate::storage::BlockingConfig;

pub struct PolicyEnforcer<R, W> {
    rules: R,
    timer: W,
    settings: BlockingConfig,
}

impl<R: RuleEngine, W: WakeTimer> PolicyEnforcer<R, W> {
    pub fn new(rules: R, timer: W, settings: BlockingConfig) -> Self {
        Self {
            rules,
            timer,
            settings,
        }
    }

    pub fn rule_engine(&self) -> &R {
        &self.rules
    }

    pub fn wake_timer(&self) -> &W {
        &self.timer
    }

    pub fn alarm_name(&self) -> &str {
        &self.settings.alarm_name
    }

    /// Rules that [`Self::reconcile`] would install for `domains`, ids `1..=N`
    /// in list order.
    pub fn build_rules(&self, domains: &[String]) -> Vec<BlockRule> {
        domains::sanitize(domains)
            .iter()
            .enumerate()
            .map(|(index, domain)| {
                BlockRule::redirect(
                    index as u32 + 1,
                    self.settings.rule_priority,
                    domain,
                    &self.settings.redirect_path,
                )
            })
            .collect()
    }

    /// Replace the whole dynamic rule set with one redirect per domain.
    /// Returns the number of rules installed.
    pub fn reconcile(&self, domains: &[String]) -> Result<usize, PolicyError> {
        let rules = self.build_rules(domains);
        self.clear_rules()?;
        if rules.is_empty() {
            return Ok(0);
        }
        let count = rules.len();
        self.rules.update_dynamic_rules(&[], rules)?;
        tracing::debug!(count, "blocking rules installed");
        Ok(count)
    }

    /// Remove every dynamic rule, whoever installed it.
    pub fn clear_rules(&self) -> Result<(), PolicyError> {
        let existing = self.rules.dynamic_rules()?;
        if existing.is_empty() {
            return Ok(());
        }
        let ids: Vec<u32> = existing.iter().map(|r| r.id).collect();
        self.rules.update_dynamic_rules(&ids, Vec::new())
    }

    /// Cancel the session alarm and, if `at_ms` is still in the future,
    /// schedule exactly one new one.
    pub fn schedule_wake(&self, at_ms: Option<i64>, now_ms: i64) -> Result<(), PolicyError> {
        let name = self.alarm_name();
        self.timer.cancel(name)?;
        if let Some(at) = at_ms.filter(|&at| at > now_ms) {
            self.timer.schedule_at(name, at)?;
            tracing::debug!(name, at, "wake-timer scheduled");
        }
        Ok(())
    }
}
