use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::commands::SensorCommand;
use crate::broadcast::Distributor;
use crate::container::LifecycleEvent;

/// The single writer of all subscription state.
///
/// Receives classified lifecycle events from the notification pipeline and subscription
/// requests from [`SensorHandle`](super::SensorHandle)s. Never performs blocking I/O.
pub struct ControlLoop {
    commands: mpsc::Receiver<SensorCommand>,
    events: mpsc::Receiver<LifecycleEvent>,
    distributor: Distributor,
}

impl ControlLoop {
    pub fn new(
        commands: mpsc::Receiver<SensorCommand>,
        events: mpsc::Receiver<LifecycleEvent>,
    ) -> Self {
        Self {
            commands,
            events,
            distributor: Distributor::new(),
        }
    }

    /// Runs until every command sender is dropped.
    ///
    /// The loop keeps serving subscriptions after the event feed ends; such subscriptions
    /// simply never receive anything.
    pub async fn run(mut self) {
        info!("OCI sensor control loop starting");
        let mut events_open = true;

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                event = self.events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("OCI notification pipeline stopped, no further events will be published");
                        events_open = false;
                    }
                },
            }
        }

        info!(
            "OCI sensor control loop stopped (subscribers: {})",
            self.distributor.subscriber_count()
        );
    }

    fn handle_command(&mut self, cmd: SensorCommand) {
        match cmd {
            SensorCommand::Subscribe { respond_to } => {
                let subscription = self.distributor.subscribe();
                // The caller may have timed out and dropped the receiver.
                if respond_to.send(subscription).is_err() {
                    debug!("Subscriber went away before receiving its subscription");
                }
            }
        }
    }

    fn handle_event(&mut self, event: LifecycleEvent) {
        let delivered = self.distributor.publish(event);
        debug!("Published lifecycle event to {} subscribers", delivered);
    }
}
