use clap::Subcommand;
use coding_mode_core::domains;
use coding_mode_core::facade::Command;

use super::{print_json, send, with_facade, CliResult};

#[derive(Subcommand)]
pub enum DomainsAction {
    /// Print the blocked domains as JSON
    List,
    /// Replace the whole list
    Set {
        /// Domains or URLs to block
        domains: Vec<String>,
    },
    /// Add domains to the list
    Add {
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Remove domains from the list
    Remove {
        #[arg(required = true)]
        domains: Vec<String>,
    },
}

pub fn run(action: DomainsAction) -> CliResult {
    match action {
        DomainsAction::List => with_facade(|facade| {
            let state = facade.manager().get_state()?;
            print_json(&state.blocked_domains)
        }),
        DomainsAction::Set { domains } => send(Command::UpdateDomains { domains }),
        DomainsAction::Add { domains } => with_facade(|facade| {
            let mut list = facade.manager().get_state()?.blocked_domains;
            list.extend(domains);
            super::respond(facade.dispatch(Command::UpdateDomains { domains: list }))
        }),
        DomainsAction::Remove { domains: removed } => with_facade(|facade| {
            let removed = domains::sanitize(&removed);
            let list: Vec<String> = facade
                .manager()
                .get_state()?
                .blocked_domains
                .into_iter()
                .filter(|d| !removed.contains(d))
                .collect();
            super::respond(facade.dispatch(Command::UpdateDomains { domains: list }))
        }),
    }
}
