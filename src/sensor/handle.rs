use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::commands::{SensorCommand, SensorError};
use crate::broadcast::Subscription;

/// Cheap-to-clone handle for requesting lifecycle event streams from a running sensor.
#[derive(Debug, Clone)]
pub struct SensorHandle {
    sender: mpsc::Sender<SensorCommand>,
    timeout: Duration,
}

impl SensorHandle {
    /// Creates a handle sending commands on `sender`; each request waits at most `timeout`
    /// for the control loop to answer.
    pub fn new(sender: mpsc::Sender<SensorCommand>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    /// Returns a fresh, independent stream of the lifecycle events published from now on.
    ///
    /// # Errors
    ///
    /// - [`SensorError::Unavailable`] if the control loop does not answer within the timeout
    /// - [`SensorError::ChannelClosed`] if the control loop has stopped
    pub async fn subscribe(&self) -> Result<Subscription, SensorError> {
        let (tx, rx) = oneshot::channel();

        let exchange = async {
            self.sender
                .send(SensorCommand::Subscribe { respond_to: tx })
                .await
                .map_err(|_| SensorError::ChannelClosed)?;

            rx.await.map_err(|_| SensorError::ChannelClosed)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| SensorError::Unavailable(self.timeout))?
    }
}
