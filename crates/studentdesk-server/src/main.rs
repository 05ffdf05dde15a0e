use std::{env, io::ErrorKind, process::ExitCode};

use studentdesk_server::ServerBuilder;
use studentdesk_server::config::loader::load_config;

const CONFIG_ENV_VAR: &str = "STUDENTDESK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "studentdesk.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal; anything else is worth a warning.
    match dotenvy::dotenv() {
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => eprintln!("Warning: ignoring .env file: {e}"),
        Ok(_) => {}
    }

    let (config_path, source) = config_path(env::args().skip(1), env::var(CONFIG_ENV_VAR).ok());

    let cfg = match load_config(Some(&config_path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    // The log format comes from the config file.
    studentdesk_server::init_tracing(&cfg.logging);
    tracing::info!(
        path = %config_path,
        source,
        backend = ?cfg.storage.backend,
        in_container = cfg.server.in_container,
        "Configuration loaded"
    );

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(2);
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// Picks the config file: `--config <path>`, then `STUDENTDESK_CONFIG`, then
/// `studentdesk.toml` in the working directory.
fn config_path(
    mut args: impl Iterator<Item = String>,
    from_env: Option<String>,
) -> (String, &'static str) {
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, "--config");
        }
    }

    match from_env {
        Some(path) if !path.is_empty() => (path, CONFIG_ENV_VAR),
        _ => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}
