use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use redline_core::error::{RedlineError, Result};
use redline_core::metrics::DEFAULT_DURATION_BUCKETS;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ListenSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub deployment: DeploymentSection,

    /// Free-form environment name; "production" redacts 5xx messages.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub shutdown: ShutdownSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ListenSection::default(),
            log: LogSection::default(),
            deployment: DeploymentSection::default(),
            environment: default_environment(),
            metrics: MetricsSection::default(),
            shutdown: ShutdownSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RedlineError::Config(format!(
                "unsupported config version {} (expected 1)",
                self.version
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(RedlineError::Config("environment must not be empty".into()));
        }

        self.server.validate()?;
        self.log.validate()?;
        self.deployment.validate()?;
        self.metrics.validate()?;
        self.shutdown.validate()?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenSection {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(RedlineError::Config("server.port must be between 1 and 65535".into()));
        }
        self.socket_addr().map(|_| ())
    }

    /// `host` must be an IP literal ("localhost" is accepted as loopback).
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = if self.host == "localhost" {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host.parse().map_err(|_| {
                RedlineError::Config(format!(
                    "server.host must be an IP address, got {:?}",
                    self.host
                ))
            })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "redline_server=debug".
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| {
                RedlineError::Config(format!("log.level {:?} is invalid: {e}", self.level))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSection {
    /// Slot / strategy label attached to `app_info` (e.g. "blue", "canary").
    #[serde(default = "default_deployment_label")]
    pub label: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for DeploymentSection {
    fn default() -> Self {
        Self {
            label: default_deployment_label(),
            version: default_app_version(),
        }
    }
}

impl DeploymentSection {
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(RedlineError::Config("deployment.label must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(RedlineError::Config("deployment.version must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Request duration histogram bounds, seconds, strictly ascending.
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            duration_buckets: default_duration_buckets(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        let b = &self.duration_buckets;
        if b.is_empty() {
            return Err(RedlineError::Config("metrics.duration_buckets must not be empty".into()));
        }
        if b.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(RedlineError::Config(
                "metrics.duration_buckets must be finite and positive".into(),
            ));
        }
        if b.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RedlineError::Config(
                "metrics.duration_buckets must be strictly ascending".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownSection {
    /// Hard ceiling for connection draining.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Upper bound for the telemetry flush that follows draining.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,

    /// Where the final metrics snapshot is written on shutdown.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            drain_timeout_ms: default_drain_timeout_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
            snapshot_path: None,
        }
    }
}

impl ShutdownSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=300000).contains(&self.drain_timeout_ms) {
            return Err(RedlineError::Config(
                "shutdown.drain_timeout_ms must be between 1000 and 300000".into(),
            ));
        }
        if self.flush_timeout_ms == 0 || self.flush_timeout_ms >= self.drain_timeout_ms {
            return Err(RedlineError::Config(
                "shutdown.flush_timeout_ms must be positive and less than drain_timeout_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_version() -> u32 {
    1
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_deployment_label() -> String {
    "standard".into()
}
fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_duration_buckets() -> Vec<f64> {
    DEFAULT_DURATION_BUCKETS.to_vec()
}
fn default_drain_timeout_ms() -> u64 {
    30000
}
fn default_flush_timeout_ms() -> u64 {
    5000
}
