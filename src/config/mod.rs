pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::Overrides;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "switchboard.toml";

/// Load configuration by merging global, project, environment, and CLI sources.
/// Precedence: CLI > environment > project config > global config > defaults.
///
/// Missing default config files are handled gracefully (defaults apply). A
/// file named explicitly with `--config` must exist and parse.
pub fn load_config(overrides: &Overrides) -> Result<AppConfig, ConfigError> {
    // Layer 1: Global config (~/.config/switchboard/switchboard.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Project config (--config, or ./switchboard.toml)
    let project = match &overrides.config {
        Some(path) => read_config_file(path)?.ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            ))
        })?,
        None => load_toml_file(Path::new(CONFIG_FILE_NAME)).unwrap_or_default(),
    };

    // Layer 3: Environment
    let env = env_partial(|key| std::env::var(key).ok())?;

    // Layer 4: CLI args
    let cli = cli_to_partial(overrides);

    cli.with_fallback(env)
        .with_fallback(project)
        .with_fallback(global)
        .finalize()
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load an optional config file, logging rather than failing on problems.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match read_config_file(path) {
        Ok(partial) => partial,
        Err(e) => {
            tracing::warn!("Ignoring config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Read and parse a TOML config file. `Ok(None)` if it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<PartialConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(Some(file.to_partial()))
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/switchboard/switchboard.toml
/// macOS: ~/Library/Application Support/switchboard/switchboard.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "switchboard")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Build the environment layer from a variable lookup.
///
/// Reads `MCP_HTTP_HOST`, `MCP_HTTP_PORT`, `ROUTER_MODEL`,
/// `CUSTOMER_DATA_MODEL`, `SUPPORT_MODEL`, and `SQL_GENERATOR_MODEL`.
/// Empty values count as unset.
pub fn env_partial(lookup: impl Fn(&str) -> Option<String>) -> Result<PartialConfig, ConfigError> {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let port = match var("MCP_HTTP_PORT") {
        Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
            key: "MCP_HTTP_PORT".to_string(),
            message: format!("'{raw}': {e}"),
        })?),
        None => None,
    };
    let host = var("MCP_HTTP_HOST");

    Ok(PartialConfig {
        mcp_url: mcp_url_from_parts(host.as_deref(), port),
        router_model: var("ROUTER_MODEL"),
        customer_data_model: var("CUSTOMER_DATA_MODEL"),
        support_model: var("SUPPORT_MODEL"),
        sql_model: var("SQL_GENERATOR_MODEL"),
        ..Default::default()
    })
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(overrides: &Overrides) -> PartialConfig {
    PartialConfig {
        max_iterations: overrides.max_iterations,
        query_timeout_secs: overrides.timeout,
        mcp_url: overrides.mcp_url.clone(),
        router_model: overrides.router_model.clone(),
        log_dir: overrides.log_dir.clone(),
        ..Default::default()
    }
}
