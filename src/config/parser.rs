use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables that override the default proxy section
pub const ENV_PROXY_HOST: &str = "SCOUT_PROXY_HOST";
pub const ENV_PROXY_PORT: &str = "SCOUT_PROXY_PORT";
pub const ENV_PROXY_USERNAME: &str = "SCOUT_PROXY_USERNAME";
pub const ENV_PROXY_PASSWORD: &str = "SCOUT_PROXY_PASSWORD";

/// Loads and parses a configuration file from the given path
///
/// Default proxy credentials may be supplied through the `SCOUT_PROXY_*`
/// environment variables; they take precedence over the file.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use product_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Burst: {}", config.admission.burst);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parses configuration text without touching the environment or validating
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies `SCOUT_PROXY_*` overrides using the given variable lookup
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let proxy = &mut config.default_proxy;

    if let Some(host) = lookup(ENV_PROXY_HOST) {
        proxy.host = host;
    }
    if let Some(port) = lookup(ENV_PROXY_PORT) {
        proxy.port = port.trim().parse().map_err(|_| {
            ConfigError::Validation(format!(
                "{} must be a port number, got '{}'",
                ENV_PROXY_PORT, port
            ))
        })?;
    }
    if let Some(username) = lookup(ENV_PROXY_USERNAME) {
        proxy.username = username;
    }
    if let Some(password) = lookup(ENV_PROXY_PASSWORD) {
        proxy.password = password;
    }

    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be tied to the exact configuration it used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
