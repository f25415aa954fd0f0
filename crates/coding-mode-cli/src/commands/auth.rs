use clap::Subcommand;
use coding_mode_core::facade::Command;

use super::{send, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Print the secret and provisioning URI, creating the secret if needed
    Show,
    /// Require an authenticator code to end sessions early
    Enable,
    /// End sessions early without a code (the secret is kept)
    Disable,
    /// Replace the secret; authenticator apps must be set up again
    Reset,
}

pub fn run(action: AuthAction) -> CliResult {
    let command = match action {
        AuthAction::Show => Command::GetAuth,
        AuthAction::Enable => Command::ToggleAuth { enabled: true },
        AuthAction::Disable => Command::ToggleAuth { enabled: false },
        AuthAction::Reset => Command::ResetAuth,
    };
    send(command)
}
