//! Platform lifecycle events and their handlers.

use serde::{Deserialize, Serialize};

use super::Facade;
use crate::clock::Clock;
use crate::error::Result;
use crate::events::Effect;
use crate::policy::{RuleEngine, WakeTimer};
use crate::storage::Store;

/// Something the host platform observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlatformEvent {
    /// First install or upgrade.
    Installed,
    /// The host process (re)started.
    Startup,
    /// A named wake-timer fired.
    Alarm { name: String },
    /// A page finished committing a navigation.
    #[serde(rename_all = "camelCase")]
    Navigation { url: String, is_top_frame: bool },
}

impl<S, R, W, C> Facade<S, R, W, C>
where
    S: Store,
    R: RuleEngine,
    W: WakeTimer,
    C: Clock,
{
    /// React to a platform event. Navigation never fails: auto-trigger
    /// problems are logged and dropped.
    pub fn handle_event(&self, event: &PlatformEvent) -> Result<Vec<Effect>> {
        let manager = self.manager();
        match event {
            PlatformEvent::Installed => {
                let domains = manager.install_defaults()?;
                tracing::info!(count = domains.len(), "default domains merged");
                Ok(Vec::new())
            }
            PlatformEvent::Startup => Ok(manager.restore()?.effects),
            PlatformEvent::Alarm { name } => {
                if name != manager.enforcer().alarm_name() {
                    tracing::debug!(name = %name, "ignoring unrelated alarm");
                    return Ok(Vec::new());
                }
                Ok(manager.timer_fired()?.effects)
            }
            PlatformEvent::Navigation { url, is_top_frame } => {
                match manager.auto_trigger(url, *is_top_frame) {
                    Ok(Some(started)) => Ok(started.effects),
                    Ok(None) => Ok(Vec::new()),
                    Err(e) => {
                        tracing::warn!(error = %e, url = %url, "auto-trigger failed");
                        Ok(Vec::new())
                    }
                }
            }
        }
    }
}
