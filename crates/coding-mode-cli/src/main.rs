use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "coding-mode", version, about = "Coding Mode CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Blocked domain list
    Domains {
        #[command(subcommand)]
        action: commands::domains::DomainsAction,
    },
    /// Authenticator gate for ending sessions early
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Start sessions automatically on coding sites
    AutoTrigger {
        #[command(subcommand)]
        action: commands::auto_trigger::AutoTriggerAction,
    },
    /// Platform lifecycle hooks (install, startup, timers, navigation)
    Hook {
        #[command(subcommand)]
        action: commands::hook::HookAction,
    },
    /// Send a raw JSON message to the facade
    Message {
        /// Message body, e.g. '{"type":"getState"}'
        json: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CODING_MODE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Domains { action } => commands::domains::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::AutoTrigger { action } => commands::auto_trigger::run(action),
        Commands::Hook { action } => commands::hook::run(action),
        Commands::Message { json } => commands::message::run(&json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
