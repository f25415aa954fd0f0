use clap::Subcommand;
use coding_mode_core::facade::Command;

use super::{send, CliResult};

#[derive(Subcommand)]
pub enum AutoTriggerAction {
    /// Start a session when a coding site is opened
    On,
    /// Never start sessions automatically
    Off,
}

pub fn run(action: AutoTriggerAction) -> CliResult {
    send(Command::SetAutoTrigger {
        enabled: matches!(action, AutoTriggerAction::On),
    })
}
