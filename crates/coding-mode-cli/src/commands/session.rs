use clap::Subcommand;
use coding_mode_core::facade::{Command, Payload};
use coding_mode_core::session::{format_countdown, format_minutes_left, EarlyEnd};

use super::{print_json, send, with_facade, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print the current session state as JSON
    Status,
    /// Start a blocking session
    Start {
        /// Session length in minutes
        minutes: f64,
    },
    /// Add minutes to the running session
    Extend {
        /// Minutes to add
        minutes: f64,
    },
    /// End the session early
    End {
        /// Authenticator code, required when auth is enabled
        #[arg(long)]
        code: Option<String>,
    },
}

pub fn run(action: SessionAction) -> CliResult {
    match action {
        SessionAction::Status => with_facade(|facade| {
            let state = facade.manager().get_state()?;
            let mut json = serde_json::to_value(&state)?;
            if let Some(obj) = json.as_object_mut() {
                obj.insert(
                    "countdown".to_string(),
                    format_countdown(state.remaining_ms).into(),
                );
                obj.insert(
                    "minutesLeft".to_string(),
                    format_minutes_left(state.remaining_ms).into(),
                );
            }
            print_json(&json)
        }),
        SessionAction::Start { minutes } => send(Command::StartSession {
            duration_minutes: Some(minutes),
        }),
        SessionAction::Extend { minutes } => send(Command::ExtendSession {
            additional_minutes: Some(minutes),
        }),
        SessionAction::End { code } => with_facade(|facade| {
            let response = facade.dispatch(Command::EndSession { code });
            print_json(&response)?;
            match response.payload {
                Some(Payload::EarlyEnd(EarlyEnd { ended: false, error })) => {
                    Err(error.unwrap_or_else(|| "session not ended".to_string()).into())
                }
                _ if !response.ok => Err(response.error.unwrap_or_default().into()),
                _ => Ok(()),
            }
        }),
    }
}
