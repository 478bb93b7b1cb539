//! The OCI lifecycle sensor.
//!
//! Two long-lived tasks make up a running sensor:
//!
//! - the notification pipeline, which owns the inotify stream and the [`WatchSet`], and
//!   classifies every notification;
//! - the [`ControlLoop`], which owns the [`Distributor`] and is the only task that attaches
//!   subscribers or publishes events.
//!
//! The pipeline talks to the control loop over a one-directional channel. Callers talk to the
//! control loop through a [`SensorHandle`].
//!
//! [`WatchSet`]: crate::watch::WatchSet
//! [`Distributor`]: crate::broadcast::Distributor
mod actor;
mod bootstrap;
mod commands;
mod handle;
mod pipeline;

pub use actor::ControlLoop;
pub use bootstrap::{BootstrapPolicy, LazySensor, Sensor};
pub use commands::{SensorCommand, SensorError};
pub use handle::SensorHandle;
