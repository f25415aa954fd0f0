pub mod auth;
pub mod auto_trigger;
pub mod config;
pub mod domains;
pub mod hook;
pub mod message;
pub mod session;

use coding_mode_core::facade::{Command, Facade, Response};
use coding_mode_core::storage::{Config, Database};
use coding_mode_core::SystemClock;
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Facade over the SQLite database in the data directory. The database plays
/// the durable store, the rule engine and the alarm service at once.
pub type CliFacade<'a> = Facade<&'a Database, &'a Database, &'a Database, SystemClock>;

/// Open the data directory and hand a facade to `f`.
pub fn with_facade<T>(f: impl FnOnce(&CliFacade<'_>) -> CliResult<T>) -> CliResult<T> {
    let db = Database::open()?;
    let config = Config::load()?;
    let facade = Facade::new(&db, &db, &db, SystemClock, config);
    f(&facade)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a facade response; a failed one also fails the command.
pub fn respond(response: Response) -> CliResult {
    print_json(&response)?;
    match response.error {
        Some(error) if !response.ok => Err(error.into()),
        _ => Ok(()),
    }
}

/// Dispatch one command and print the answer.
pub fn send(command: Command) -> CliResult {
    with_facade(|facade| respond(facade.dispatch(command)))
}
