//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load `APP_*` configuration, start file logging and open one session
//!   against the configured database.
//! - Keep output deterministic for quick local sanity checks.

use log::{error, info};
use modelbase_core::{core_version, init_logging, ping, Config};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("modelbase config error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_logging(&config.log_level, &config.log_directory) {
        // Logging is optional for the probe.
        eprintln!("modelbase logging disabled: {err}");
    }

    println!("modelbase_core ping={}", ping());
    println!("modelbase_core version={}", core_version());

    let probe = config
        .database()
        .and_then(|db| db.with_session(|session| Ok(session.id())).map(|id| (db, id)));
    match probe {
        Ok((db, session_id)) => {
            info!(
                "event=health_check module=cli status=ok session={} testing={}",
                session_id, config.testing
            );
            println!("modelbase_core database={} status=ok", db.path().display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=health_check module=cli status=error error_code=db_unavailable error={}",
                err
            );
            println!("modelbase_core database={} status=error", config.database_uri);
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
