//! Sensor configuration resolved from the process environment.
//!
//! | variable | default |
//! |---|---|
//! | `OCI_CONTAINER_DIR` | `/var/run/docker/libcontainerd` |
//! | `OCI_SUBSCRIBE_TIMEOUT_MS` | `5000` |
//! | `OCI_READ_ERROR_POLICY` | `drop` (or `retry-once`) |
//! | `OCI_BOOTSTRAP_POLICY` | `once` (or `retry`) |
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::classifier::ReadErrorPolicy;
use crate::sensor::BootstrapPolicy;

pub const CONTAINER_DIR_VAR: &str = "OCI_CONTAINER_DIR";
pub const SUBSCRIBE_TIMEOUT_VAR: &str = "OCI_SUBSCRIBE_TIMEOUT_MS";
pub const READ_ERROR_POLICY_VAR: &str = "OCI_READ_ERROR_POLICY";
pub const BOOTSTRAP_POLICY_VAR: &str = "OCI_BOOTSTRAP_POLICY";

/// Directory the container runtime keeps its per-container state directories in.
pub const DEFAULT_CONTAINER_DIR: &str = "/var/run/docker/libcontainerd";
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{var}` is not valid unicode: {value:?}")]
    NotUnicode { var: &'static str, value: OsString },
    #[error("invalid value `{value}` for environment variable `{var}`")]
    InvalidValue { var: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    container_dir: PathBuf,
    subscribe_timeout: Duration,
    read_error_policy: ReadErrorPolicy,
    bootstrap_policy: BootstrapPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            container_dir: PathBuf::from(DEFAULT_CONTAINER_DIR),
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            read_error_policy: ReadErrorPolicy::default(),
            bootstrap_policy: BootstrapPolicy::default(),
        }
    }
}

impl SensorConfig {
    /// Resolves the configuration from the process environment.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup(CONTAINER_DIR_VAR) {
            config.container_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, SUBSCRIBE_TIMEOUT_VAR)? {
            config.subscribe_timeout = Duration::from_millis(ms);
        }
        if let Some(policy) = parse_var(&lookup, READ_ERROR_POLICY_VAR)? {
            config.read_error_policy = policy;
        }
        if let Some(policy) = parse_var(&lookup, BOOTSTRAP_POLICY_VAR)? {
            config.bootstrap_policy = policy;
        }

        Ok(config)
    }

    pub fn with_container_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.container_dir = dir.into();
        self
    }

    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    pub fn with_read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.read_error_policy = policy;
        self
    }

    pub fn with_bootstrap_policy(mut self, policy: BootstrapPolicy) -> Self {
        self.bootstrap_policy = policy;
        self
    }

    pub fn container_dir(&self) -> &Path {
        &self.container_dir
    }

    pub fn subscribe_timeout(&self) -> Duration {
        self.subscribe_timeout
    }

    pub fn read_error_policy(&self) -> ReadErrorPolicy {
        self.read_error_policy
    }

    pub fn bootstrap_policy(&self) -> BootstrapPolicy {
        self.bootstrap_policy
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<OsString>,
    var: &'static str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|value| Error::NotUnicode { var, value })?;

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| Error::InvalidValue { var, value })
}
