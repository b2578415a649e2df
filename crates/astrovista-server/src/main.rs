use std::env;

use astrovista_server::ServerBuilder;
use astrovista_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From ASTROVISTA_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (astrovista.toml), used only when present
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (ASTROVISTA_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    astrovista_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
        source = %source,
        "Configuration loaded"
    );

    astrovista_server::observability::apply_logging_level(&cfg.logging.level);
    if !astrovista_server::metrics::init_metrics() {
        tracing::warn!("Prometheus recorder not installed, /metrics will be unavailable");
    }

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: ASTROVISTA_CONFIG
/// 3. `astrovista.toml` if it exists, otherwise defaults plus environment
fn resolve_config_path() -> (Option<String>, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (Some(path), ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("ASTROVISTA_CONFIG")
        && !path.is_empty()
    {
        return (Some(path), ConfigSource::EnvironmentVariable);
    }

    (None, ConfigSource::Default)
}
