use serde::{Deserialize, Serialize};

use crate::domains;

/// Side effects a session transition asks its host to carry out.
/// The core never touches tabs or windows itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    /// Reload every open page on one of `domains` so the new blocking state
    /// takes hold immediately.
    ReloadMatchingTabs { domains: Vec<String> },
}

impl Effect {
    pub fn reload_matching(domains: &[String]) -> Option<Self> {
        if domains.is_empty() {
            return None;
        }
        Some(Effect::ReloadMatchingTabs {
            domains: domains.to_vec(),
        })
    }

    /// Whether a page at `url` is targeted by this effect.
    pub fn matches_url(&self, url: &str) -> bool {
        match self {
            Effect::ReloadMatchingTabs { domains } => domains
                .iter()
                .any(|domain| domains::url_matches_domain(url, domain)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reload_for_empty_list() {
        assert!(Effect::reload_matching(&[]).is_none());
    }

    #[test]
    fn reload_matches_listed_hosts() {
        let effect = Effect::reload_matching(&["reddit.com".to_string()]).unwrap();
        assert!(effect.matches_url("https://www.reddit.com/r/rust"));
        assert!(!effect.matches_url("https://github.com/"));
    }

    #[test]
    fn serializes_with_type_tag() {
        let effect = Effect::reload_matching(&["a.com".to_string()]).unwrap();
        assert_eq!(
            serde_json::to_value(&effect).unwrap(),
            serde_json::json!({"type": "reloadMatchingTabs", "domains": ["a.com"]})
        );
    }
}
