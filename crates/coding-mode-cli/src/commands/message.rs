use super::{respond, with_facade, CliResult};

/// Answer a raw facade message, exactly as a UI would send it.
pub fn run(json: &str) -> CliResult {
    with_facade(|facade| respond(facade.dispatch_json(json)))
}
