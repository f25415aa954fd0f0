use clap::Subcommand;
use coding_mode_core::facade::PlatformEvent;
use coding_mode_core::policy::WakeTimer;
use coding_mode_core::{Clock, Effect};
use serde::Serialize;

use super::{print_json, with_facade, CliFacade, CliResult};

#[derive(Subcommand)]
pub enum HookAction {
    /// Run after install or upgrade: merge the default domain list
    Install,
    /// Run when the host starts: rebuild rules and alarms from saved state
    Startup,
    /// Fire every alarm that is due (run from cron or a systemd timer)
    Wake,
    /// Report a page navigation for auto-trigger
    Navigate {
        url: String,
        /// The navigation happened in a nested frame
        #[arg(long)]
        sub_frame: bool,
    },
}

#[derive(Serialize)]
struct HookOutput {
    ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fired: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    effects: Vec<Effect>,
}

pub fn run(action: HookAction) -> CliResult {
    with_facade(|facade| {
        let output = match action {
            HookAction::Install => single(facade, PlatformEvent::Installed)?,
            HookAction::Startup => single(facade, PlatformEvent::Startup)?,
            HookAction::Navigate { url, sub_frame } => single(
                facade,
                PlatformEvent::Navigation {
                    url,
                    is_top_frame: !sub_frame,
                },
            )?,
            HookAction::Wake => wake(facade)?,
        };
        print_json(&output)
    })
}

fn single(facade: &CliFacade<'_>, event: PlatformEvent) -> CliResult<HookOutput> {
    Ok(HookOutput {
        ok: true,
        fired: Vec::new(),
        effects: facade.handle_event(&event)?,
    })
}

fn wake(facade: &CliFacade<'_>) -> CliResult<HookOutput> {
    let manager = facade.manager();
    let db = manager.store();
    let due = db.due_alarms(manager.clock().now_ms())?;
    let mut fired = Vec::new();
    let mut effects = Vec::new();
    for (name, _) in due {
        // Alarms are one-shot; the handler schedules again if it needs to.
        db.cancel(&name)?;
        tracing::info!(name = %name, "firing alarm");
        effects.extend(facade.handle_event(&PlatformEvent::Alarm { name: name.clone() })?);
        fired.push(name);
    }
    Ok(HookOutput {
        ok: true,
        fired,
        effects,
    })
}
