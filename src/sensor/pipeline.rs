use futures::StreamExt;
use inotify::{EventMask, EventStream, Watches};
use tokio::sync::mpsc;

use crate::classifier::{Classification, ReadErrorPolicy, classify};
use crate::container::LifecycleEvent;
use crate::error::ResultOkLogExt;
use crate::watch::{self, WatchSet};

/// Consumes raw inotify events, classifies them, and forwards lifecycle events to the control
/// loop.
///
/// This task is the only owner of the [`WatchSet`]. It ends when the inotify stream fails or
/// when the control loop is gone.
pub(super) async fn run(
    mut stream: EventStream<Vec<u8>>,
    mut watches: WatchSet<Watches>,
    events: mpsc::Sender<LifecycleEvent>,
    policy: ReadErrorPolicy,
) {
    log::info!(
        "OCI notification pipeline watching `{}` ({} paths)",
        watches.root().display(),
        watches.len()
    );

    while let Some(raw) = stream.next().await {
        let raw = match raw {
            Ok(raw) => raw,
            Err(err) => {
                log::error!("{}", watch::Error::ReadEvent(err));
                break;
            }
        };

        if raw.mask.contains(EventMask::Q_OVERFLOW) {
            log::warn!("inotify event queue overflowed, lifecycle events may have been lost");
            continue;
        }

        let Some(notification) = watches.resolve(&raw.wd, raw.mask, raw.name) else {
            continue;
        };

        let classification = classify(&notification, &mut watches, policy)
            .await
            .ok_log();

        if let Some(Classification::Event(event)) = classification {
            if events.send(event).await.is_err() {
                log::info!("OCI sensor control loop is gone, stopping notification pipeline");
                break;
            }
        }
    }

    log::info!("OCI notification pipeline stopped");
}
