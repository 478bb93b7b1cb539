use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::broadcast::Subscription;
use crate::watch;

/// Requests handled by the control loop.
#[derive(Debug)]
pub enum SensorCommand {
    /// Attach a new subscriber to the lifecycle event feed.
    Subscribe {
        respond_to: oneshot::Sender<Subscription>,
    },
}

/// Errors returned to callers asking for a lifecycle event stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SensorError {
    /// Starting the sensor failed. Shared because a failed bootstrap may be reported to every
    /// later caller.
    #[error("failed to start OCI sensor: {0}")]
    Bootstrap(#[source] Arc<watch::Error>),

    /// The control loop did not answer in time.
    #[error("OCI sensor did not respond within {}ms", .0.as_millis())]
    Unavailable(Duration),

    /// The control loop is no longer running.
    #[error("OCI sensor control channel closed")]
    ChannelClosed,
}
