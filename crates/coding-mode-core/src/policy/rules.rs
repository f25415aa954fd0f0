//! Declarative blocking rules and the engine that applies them.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    Redirect {
        #[serde(rename = "extensionPath")]
        extension_path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// One redirect rule, shaped like a declarative-request rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl BlockRule {
    /// Redirect top-level and frame navigations to `domain` onto `redirect_path`.
    pub fn redirect(id: u32, priority: u32, domain: &str, redirect_path: &str) -> Self {
        Self {
            id,
            priority,
            action: RuleAction::Redirect {
                extension_path: redirect_path.to_string(),
            },
            condition: RuleCondition {
                url_filter: format!("||{domain}/*"),
                resource_types: vec![ResourceType::MainFrame, ResourceType::SubFrame],
            },
        }
    }

    /// The domain this rule was built for, recovered from its URL filter.
    pub fn domain(&self) -> &str {
        let filter = self.condition.url_filter.as_str();
        let filter = filter.strip_prefix("||").unwrap_or(filter);
        filter.strip_suffix("/*").unwrap_or(filter)
    }
}

/// Platform request-blocking engine holding the dynamic rule set.
pub trait RuleEngine {
    fn dynamic_rules(&self) -> Result<Vec<BlockRule>, PolicyError>;

    /// Remove `remove_ids`, then add `add`. Adding an id that already exists
    /// is rejected.
    fn update_dynamic_rules(&self, remove_ids: &[u32], add: Vec<BlockRule>) -> Result<(), PolicyError>;
}

impl<T: RuleEngine + ?Sized> RuleEngine for &T {
    fn dynamic_rules(&self) -> Result<Vec<BlockRule>, PolicyError> {
        (**self).dynamic_rules()
    }

    fn update_dynamic_rules(&self, remove_ids: &[u32], add: Vec<BlockRule>) -> Result<(), PolicyError> {
        (**self).update_dynamic_rules(remove_ids, add)
    }
}

/// In-process rule engine.
#[derive(Debug, Default)]
pub struct MemoryRuleEngine {
    rules: RefCell<Vec<BlockRule>>,
    updates: Cell<usize>,
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accepted `update_dynamic_rules` calls.
    pub fn update_count(&self) -> usize {
        self.updates.get()
    }
}

impl RuleEngine for MemoryRuleEngine {
    fn dynamic_rules(&self) -> Result<Vec<BlockRule>, PolicyError> {
        Ok(self.rules.borrow().clone())
    }

    fn update_dynamic_rules(&self, remove_ids: &[u32], add: Vec<BlockRule>) -> Result<(), PolicyError> {
        let mut rules = self.rules.borrow_mut();
        let mut next: Vec<BlockRule> = rules
            .iter()
            .filter(|r| !remove_ids.contains(&r.id))
            .cloned()
            .collect();
        for rule in add {
            if next.iter().any(|r| r.id == rule.id) {
                return Err(PolicyError::RuleUpdateRejected(format!(
                    "rule id {} already exists",
                    rule.id
                )));
            }
            next.push(rule);
        }
        *rules = next;
        self.updates.set(self.updates.get() + 1);
        Ok(())
    }
}
