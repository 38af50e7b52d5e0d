//! # Configuration.
//!
//! [`Config`] is decoded from a YAML or JSON file (chosen by extension) and
//! consumed by the supervisor. The interesting part is the endpoint groups: a
//! `type` discriminator selects the shape of `spec`, modelled as the sum type
//! [`EndpointGroup`]. Only `ecs` groups produce cluster queries.
//!
//! ```yaml
//! app:
//!   vault:
//!     vault_endpoints:
//!       - type: ecs
//!         spec:
//!           - cluster: vault
//!             region: eu-west-1
//!   vaultguard:
//!     init: true
//!     unseal: true
//!     listen_address: 0.0.0.0
//!     listen_port: "8080"
//!     timings:            # optional, milliseconds
//!       tick_interval_ms: 5000
//!       health_shutdown_ms: 5000
//!       grace_ms: 10000
//! ```
//!
//! ## Search order
//! Without an explicit path: `/etc/vaultguard/config.yaml`, then
//! `$HOME/vaultguard/config.yaml`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::discovery::ClusterQuery;
use crate::error::ConfigError;

/// Verbosity toggles passed explicitly to the components that honour them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Debug-level logging.
    pub debug: bool,
    /// Dump decoded configuration and per-stage discovery records.
    pub debug_config: bool,
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Application section.
    pub app: App,
}

/// Application section: vault targets plus vaultguard's own settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct App {
    /// Where the vault servers are.
    #[serde(default)]
    pub vault: VaultSection,
    /// What vaultguard does with them.
    #[serde(rename = "vaultguard")]
    pub guard: GuardConfig,
}

/// Vault targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VaultSection {
    /// Endpoint groups, in configuration order.
    #[serde(default, rename = "vault_endpoints")]
    pub endpoints: Vec<EndpointGroup>,
}

/// A group of vault endpoints, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "spec", rename_all = "lowercase")]
pub enum EndpointGroup {
    /// Vault tasks on ECS clusters.
    Ecs(Vec<EcsSpec>),
    /// Vault behind a kubernetes service. Not resolved by vaultguard.
    K8s(Vec<K8sSpec>),
    /// Vault at a fixed URL. Not resolved by vaultguard.
    Url(Vec<UrlSpec>),
}

impl EndpointGroup {
    /// Discriminator as written in the file.
    pub fn kind(&self) -> &'static str {
        match self {
            EndpointGroup::Ecs(_) => "ecs",
            EndpointGroup::K8s(_) => "k8s",
            EndpointGroup::Url(_) => "url",
        }
    }
}

/// ECS cluster holding vault tasks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EcsSpec {
    /// Cluster name or arn.
    pub cluster: String,
    /// Region of the cluster.
    pub region: String,
}

/// Kubernetes service fronting vault.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct K8sSpec {
    /// Namespace of the service.
    pub namespace: String,
    /// Service name.
    pub service: String,
}

/// Fixed vault URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlSpec {
    /// The URL.
    pub url: String,
}

/// Vaultguard's own settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardConfig {
    /// Run the initialize worker.
    #[serde(default)]
    pub init: bool,
    /// Run the unseal worker.
    #[serde(default)]
    pub unseal: bool,
    /// Health endpoint bind address.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Health endpoint port; a string or an integer in the file.
    #[serde(deserialize_with = "port")]
    pub listen_port: u16,
    /// Worker and shutdown timings.
    #[serde(default)]
    pub timings: Timings,
}

/// Worker and shutdown timings, in milliseconds.
///
/// Worst-case drain latency is `max(tick_interval, health_shutdown)`;
/// `grace` bounds the whole drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Period of lifecycle worker ticks.
    pub tick_interval_ms: u64,
    /// Bound on the health endpoint's graceful shutdown.
    pub health_shutdown_ms: u64,
    /// Bound on the whole drain.
    pub grace_ms: u64,
}

impl Timings {
    /// Lifecycle worker tick period.
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Health endpoint shutdown bound.
    #[inline]
    pub fn health_shutdown(&self) -> Duration {
        Duration::from_millis(self.health_shutdown_ms)
    }

    /// Drain bound.
    #[inline]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

impl Default for Timings {
    /// - `tick_interval = 5s`
    /// - `health_shutdown = 5s`
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            tick_interval_ms: 5_000,
            health_shutdown_ms: 5_000,
            grace_ms: 10_000,
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".to_owned()
}

fn port<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(d)? {
        Repr::Number(n) => u16::try_from(n).map_err(serde::de::Error::custom),
        Repr::Text(s) => s.trim().parse::<u16>().map_err(serde::de::Error::custom),
    }
}

/// File format, picked from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Format {
    fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    fn of(path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(ConfigError::UnsupportedFormat {
                format: other.to_owned(),
            }),
        }
    }
}

impl Config {
    /// Paths probed when no explicit path is given.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/vaultguard/config.yaml")];
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join("vaultguard").join("config.yaml"));
        }
        paths
    }

    /// Loads `explicit` if given, otherwise the first existing default path.
    pub fn locate_and_load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let searched = Self::default_paths();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound { searched }),
        }
    }

    /// Reads, decodes and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = Format::of(path)?;
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        match format {
            Format::Json => Self::from_json_str(&raw),
            Format::Yaml => Self::from_yaml_str(&raw),
        }
    }

    /// Decodes and validates a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
            format: Format::Yaml.as_str(),
            reason: e.to_string(),
        })?;
        cfg.validate()
    }

    /// Decodes and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Parse {
            format: Format::Json.as_str(),
            reason: e.to_string(),
        })?;
        cfg.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let guard = &self.app.guard;
        if guard.listen_address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "app.vaultguard.listen_address",
                value: guard.listen_address.clone(),
                reason: "must not be empty",
            });
        }
        if guard.timings.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "app.vaultguard.timings.tick_interval_ms",
                value: "0".to_owned(),
                reason: "must be greater than zero",
            });
        }
        Ok(self)
    }

    /// Builds one query per ECS spec, in configuration order.
    ///
    /// `k8s` and `url` groups are skipped with a warning.
    pub fn cluster_queries(&self) -> Vec<ClusterQuery> {
        let mut queries = Vec::new();
        for group in &self.app.vault.endpoints {
            match group {
                EndpointGroup::Ecs(specs) => queries.extend(
                    specs
                        .iter()
                        .map(|s| ClusterQuery::new(s.region.as_str(), s.cluster.as_str())),
                ),
                other => warn!(
                    kind = other.kind(),
                    "endpoint group type is not resolved by vaultguard; skipping"
                ),
            }
        }
        queries
    }

    /// Health endpoint bind address.
    pub fn listen_addr(&self) -> (String, u16) {
        (
            self.app.guard.listen_address.clone(),
            self.app.guard.listen_port,
        )
    }
}
