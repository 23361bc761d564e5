//! EagleEye field-agent roster CLI.
//!
//! # Responsibility
//! - Resolve configuration (process environment over `.env`) and logging
//!   once at startup.
//! - Initialize the store, then hand control to the interactive menu.
//!
//! # Invariants
//! - Configuration and schema failures abort startup with a non-zero exit.
//! - Failures inside a menu selection never terminate the process.

mod menu;

use eagleeye_core::{
    core_version, default_log_level, init_logging, load_dotenv, DatabaseConfig, RosterService,
    SchemaInitializer, SqliteAgentRepository,
};
use log::{error, info};
use menu::Menu;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_LEVEL_VAR: &str = "EAGLEEYE_LOG_LEVEL";
const LOG_DIR_VAR: &str = "EAGLEEYE_LOG_DIR";

fn main() -> ExitCode {
    println!("=== EAGLE EYE FIELD AGENT MANAGEMENT SYSTEM ===");
    println!("core version {}\n", core_version());

    // Before logging, so `.env` can carry the log settings too.
    if let Err(err) = load_dotenv() {
        eprintln!("Configuration error: {err}");
        return ExitCode::FAILURE;
    }

    let level = std::env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| default_log_level().to_string());
    match resolve_log_dir() {
        Ok(log_dir) => {
            if let Err(err) = init_logging(&level, &log_dir) {
                eprintln!("warning: file logging disabled: {err}");
            }
        }
        Err(err) => eprintln!("warning: file logging disabled: {err}"),
    }

    let config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("event=startup module=cli status=error stage=config error={err}");
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match SchemaInitializer::new(config.clone()).ensure_ready() {
        Ok(status) => {
            if status.reset {
                println!("Existing agent records were dropped (reset on start is enabled).");
            }
            if status.created {
                println!("Database and tables created successfully with correct structure.");
            } else {
                println!("Database already exists.");
            }
            println!(
                "Database connection test: {}",
                if status.can_connect { "Success" } else { "Failed" }
            );
        }
        Err(err) => {
            error!("event=startup module=cli status=error stage=schema_init error={err}");
            eprintln!("Error ensuring database exists: {err}");
            return ExitCode::FAILURE;
        }
    }

    info!("event=startup module=cli status=ok");
    let service = RosterService::new(SqliteAgentRepository::new(config));
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut menu = Menu::new(service, stdin.lock(), stdout.lock());

    match menu.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=shutdown module=cli status=error error={err}");
            eprintln!("Terminal error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_log_dir() -> io::Result<PathBuf> {
    if let Some(dir) = std::env::var_os(LOG_DIR_VAR) {
        return Ok(PathBuf::from(dir));
    }
    Ok(std::env::current_dir()?.join("logs"))
}
