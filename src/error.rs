//! Error types used by vaultguard.
//!
//! - [`ConfigError`] — the configuration file could not be read, decoded or validated.
//! - [`ApiError`] — a single orchestration API call failed as a whole.
//! - [`DiscoveryError`] — a fault recorded in a [`DiscoveryResult`](crate::DiscoveryResult).
//! - [`WorkerError`] — errors raised by lifecycle workers and the health endpoint.
//! - [`RuntimeError`] — errors raised by the supervisor itself.
//!
//! All types provide `as_label` for logs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::discovery::Stage;

/// # Errors produced while loading configuration.
///
/// Any of these is fatal to process start.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No `--config` was given and none of the default locations holds a file.
    #[error("no configuration file found (searched: {searched:?})")]
    NotFound {
        /// Paths that were probed.
        searched: Vec<PathBuf>,
    },

    /// The file exists but could not be read.
    #[error("unable to read config file {path:?}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The extension is neither `json`, `yaml` nor `yml`.
    #[error("unsupported config file format: {format:?}")]
    UnsupportedFormat {
        /// Extension as found on the path.
        format: String,
    },

    /// The content did not decode.
    #[error("unable to decode {format} config file: {reason}")]
    Parse {
        /// `json` or `yaml`.
        format: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The content decoded but a value is unusable.
    #[error("invalid configuration: {field} = {value:?} ({reason})")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "config_not_found",
            ConfigError::Read { .. } => "config_read",
            ConfigError::UnsupportedFormat { .. } => "config_unsupported_format",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

/// # A failed orchestration API call.
///
/// Covers network, authorization and server-side failures of a whole call.
/// Per-resource failures returned inline by a batch call are not `ApiError`s,
/// see [`ResourceFailure`](crate::discovery::ResourceFailure).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed{}: {message}", render_code(.code))]
pub struct ApiError {
    /// Stage that issued the call.
    pub stage: Stage,
    /// Service error code, when the service returned one.
    pub code: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ApiError {
    /// Creates an error without a service code.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            code: None,
            message: message.into(),
        }
    }

    /// Attaches a service error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

fn render_code(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

/// Classification of a discovery fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Invalid or unsupported input; no network call was made.
    ConfigError,
    /// A whole API call failed; the cluster's resolution stopped there.
    TransportError,
    /// A named resource failed inside an otherwise successful batch call.
    PartialFailure,
}

/// # Faults recorded per cluster during discovery.
///
/// These never unwind past the resolver: they are collected into
/// [`DiscoveryResult::faults`](crate::DiscoveryResult::faults).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Region is not on the allow-list.
    #[error("unsupported region {region:?}")]
    UnsupportedRegion {
        /// Region as configured.
        region: String,
    },

    /// A whole API call failed.
    #[error("transport failure: {0}")]
    Transport(#[from] ApiError),

    /// A single resource failed inside a batch call.
    #[error("{stage} partial failure for {resource}: {reason}")]
    PartialFailure {
        /// Stage whose batch call reported the failure.
        stage: Stage,
        /// Identifier (arn or id) of the failed resource.
        resource: String,
        /// Reason as reported by the service.
        reason: String,
    },
}

impl DiscoveryError {
    /// Returns the fault classification.
    pub fn kind(&self) -> FaultKind {
        match self {
            DiscoveryError::UnsupportedRegion { .. } => FaultKind::ConfigError,
            DiscoveryError::Transport(_) => FaultKind::TransportError,
            DiscoveryError::PartialFailure { .. } => FaultKind::PartialFailure,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self.kind() {
            FaultKind::ConfigError => "discovery_config_error",
            FaultKind::TransportError => "discovery_transport_error",
            FaultKind::PartialFailure => "discovery_partial_failure",
        }
    }
}

/// # Errors produced by workers.
///
/// `Fail` is recoverable: it is reported and the worker keeps going.
/// `Fatal` and `HandoffDropped` end the worker and trigger a full drain.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Non-recoverable error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Recoverable error for a single unit of work.
    #[error("work failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The discovery handoff sender went away without delivering.
    #[error("discovery handoff dropped before delivery")]
    HandoffDropped,

    /// Worker observed cancellation.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::HandoffDropped => "worker_handoff_dropped",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Whether the supervisor must drain when this error is reported.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Fatal { .. } | WorkerError::HandoffDropped)
    }
}

/// # Errors produced by the supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Draining did not complete within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers still running when the grace period ended.
        stuck: Vec<String>,
    },

    /// The supervisor was already started once.
    #[error("supervisor already started")]
    AlreadyStarted,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use vaultguard::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::AlreadyStarted => "runtime_already_started",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_faults_are_classified() {
        let region = DiscoveryError::UnsupportedRegion {
            region: "us-east-1".into(),
        };
        assert_eq!(region.kind(), FaultKind::ConfigError);

        let transport: DiscoveryError = ApiError::new(Stage::ListTasks, "timeout").into();
        assert_eq!(transport.kind(), FaultKind::TransportError);

        let partial = DiscoveryError::PartialFailure {
            stage: Stage::DescribeContainerInstances,
            resource: "arn:ci/1".into(),
            reason: "MISSING".into(),
        };
        assert_eq!(partial.kind(), FaultKind::PartialFailure);
        assert_eq!(partial.as_label(), "discovery_partial_failure");
    }

    #[test]
    fn api_error_renders_code_when_present() {
        let plain = ApiError::new(Stage::DescribeHosts, "connection reset");
        assert_eq!(plain.to_string(), "describe-hosts failed: connection reset");

        let coded = ApiError::new(Stage::ListTasks, "no such cluster")
            .with_code("ClusterNotFoundException");
        assert_eq!(
            coded.to_string(),
            "list-tasks failed (ClusterNotFoundException): no such cluster"
        );
    }

    #[test]
    fn only_fatal_worker_errors_drain() {
        assert!(WorkerError::Fatal { error: "x".into() }.is_fatal());
        assert!(WorkerError::HandoffDropped.is_fatal());
        assert!(!WorkerError::Fail { error: "x".into() }.is_fatal());
        assert!(!WorkerError::Canceled.is_fatal());
    }
}
