use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;
mod utils;

pub use error::{Error, Result};
pub use utils::{CONTAINER_ID_LEN, is_container_id_shape};

/// A validated container identifier.
///
/// Container identifiers are the names of the per-container state directories the runtime
/// creates under its root, i.e. 64 hex digits.
///
/// # Examples
///
/// ```
/// # use oci_lifecycle_sensor::container::ContainerID;
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), raw_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is not exactly
    /// [`CONTAINER_ID_LEN`] hex digits.
    ///
    /// # Examples
    ///
    /// ```
    /// # use oci_lifecycle_sensor::container::ContainerID;
    /// assert!(ContainerID::new("config.json").is_err());
    /// ```
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if !is_container_id_shape(src) {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OCI container lifecycle states.
///
/// See <https://github.com/opencontainers/runtime-spec/blob/main/runtime.md>.
///
/// Only [`Running`] and [`Stopped`] are observable through the runtime state directory; the
/// remaining states are kept so consumers can match on the full OCI lifecycle.
///
/// [`Running`]: LifecycleState::Running
/// [`Stopped`]: LifecycleState::Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Creating,
    Created,
    Running,
    Stopped,
    Deleted,
}

impl LifecycleState {
    /// Returns true if the sensor can ever emit this state.
    pub fn is_observable(self) -> bool {
        matches!(self, Self::Running | Self::Stopped)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A container transitioning between lifecycle states.
///
/// Events are immutable once created. Cloning is cheap: the identifier and the configuration
/// payload are reference counted, so every subscriber shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LifecycleEvent {
    container_id: ContainerID,
    state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<Arc<str>>,
}

impl LifecycleEvent {
    /// A container started running. `config` is the content of its `config.json` at the time
    /// the write was observed.
    pub fn running(container_id: ContainerID, config: impl Into<Arc<str>>) -> Self {
        Self {
            container_id,
            state: LifecycleState::Running,
            config: Some(config.into()),
        }
    }

    /// A container stopped. Stop events never carry a configuration payload.
    pub fn stopped(container_id: ContainerID) -> Self {
        Self {
            container_id,
            state: LifecycleState::Stopped,
            config: None,
        }
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The raw `config.json` content captured for a [`LifecycleState::Running`] event.
    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.container_id, self.state)
    }
}
