//! Server config loader.
//!
//! Precedence: built-in defaults, then the YAML file named by `REDLINE_CONFIG`
//! (strict parsing), then environment overrides. Everything is read once at
//! startup.

pub mod schema;

use std::fs;

use redline_core::error::{RedlineError, Result};

pub use schema::{
    DeploymentSection, ListenSection, LogSection, MetricsSection, ServerConfig, ShutdownSection,
};

/// Env var naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "REDLINE_CONFIG";

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RedlineError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| RedlineError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load using the real process environment.
pub fn load_from_env() -> Result<ServerConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load using `lookup` for every environment read.
pub fn load_with<F>(lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match lookup(CONFIG_PATH_ENV) {
        Some(path) if !path.trim().is_empty() => load_from_file(&path)?,
        _ => ServerConfig::default(),
    };
    apply_env(&mut cfg, &lookup)?;
    cfg.validate()?;
    Ok(cfg)
}

fn apply_env<F>(cfg: &mut ServerConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("HOST") {
        cfg.server.host = host;
    }
    if let Some(port) = lookup("PORT") {
        cfg.server.port = port.trim().parse().map_err(|_| {
            RedlineError::Config(format!("PORT must be a number in 1..=65535, got {port:?}"))
        })?;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        cfg.log.level = level;
    }
    if let Some(label) = lookup("DEPLOYMENT_TYPE") {
        cfg.deployment.label = label;
    }
    if let Some(env) = lookup("APP_ENV") {
        cfg.environment = env;
    }
    if let Some(version) = lookup("APP_VERSION") {
        cfg.deployment.version = version;
    }
    Ok(())
}
