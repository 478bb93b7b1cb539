//! Maps resolved filesystem notifications onto container lifecycle transitions.
//!
//! | notification | result |
//! |---|---|
//! | `<root>/<id>/config.json` closed after write | [`LifecycleState::Running`] with the file content |
//! | `<root>/<id>/config.json` deleted | [`LifecycleState::Stopped`] |
//! | `<root>/<id>` directory created | watch registered on `<root>/<id>` |
//! | anything else | discarded |
//!
//! [`LifecycleState::Running`]: crate::container::LifecycleState::Running
//! [`LifecycleState::Stopped`]: crate::container::LifecycleState::Stopped
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use inotify::EventMask;

use crate::container::{ContainerID, LifecycleEvent};
use crate::error::ResultOkLogExt;
use crate::fsutil;
use crate::watch::{self, Notification, Registrar, WatchSet};

/// The file the runtime writes into a container's state directory when it starts the
/// container and removes when the container stops.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Delay before the second read attempt of [`ReadErrorPolicy::RetryOnce`].
pub const RETRY_DELAY: Duration = Duration::from_millis(10);

/// What to do when `config.json` cannot be read after a write was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadErrorPolicy {
    /// Log the error and emit no event for the notification.
    #[default]
    Drop,
    /// Wait [`RETRY_DELAY`] and read once more before dropping.
    RetryOnce,
}

impl FromStr for ReadErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(Self::Drop),
            "retry-once" => Ok(Self::RetryOnce),
            other => Err(other.to_owned()),
        }
    }
}

/// Outcome of classifying one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The notification is a lifecycle transition.
    Event(LifecycleEvent),
    /// A new container directory appeared and is now watched.
    Watched(PathBuf),
    /// The notification is not relevant.
    Ignored,
}

/// Classifies a single notification.
///
/// Reads `config.json` for running transitions; read failures are handled according to
/// `policy` and never surface as errors.
///
/// # Errors
///
/// Returns [`watch::Error::AddWatch`] if a new container directory could not be watched.
pub async fn classify<R: Registrar>(
    notification: &Notification,
    watches: &mut WatchSet<R>,
    policy: ReadErrorPolicy,
) -> watch::Result<Classification> {
    let mask = notification.mask();

    if notification.name() == CONFIG_FILE_NAME {
        if mask.contains(EventMask::CLOSE_WRITE) {
            let Some(id) = container_id(notification.path()) else {
                return Ok(Classification::Ignored);
            };
            let Some(config) = read_config(notification.path(), policy).await else {
                return Ok(Classification::Ignored);
            };
            log::debug!("Container `{}` is running", id);
            return Ok(Classification::Event(LifecycleEvent::running(id, config)));
        }

        if mask.contains(EventMask::DELETE) {
            let Some(id) = container_id(notification.path()) else {
                return Ok(Classification::Ignored);
            };
            log::debug!("Container `{}` stopped", id);
            return Ok(Classification::Event(LifecycleEvent::stopped(id)));
        }
    } else if notification.dir() == watches.root()
        && mask.contains(EventMask::CREATE)
        && mask.contains(EventMask::ISDIR)
        && watches.consider_path(notification.path(), notification.name())?
    {
        return Ok(Classification::Watched(notification.path().to_path_buf()));
    }

    log::trace!(
        "Ignoring notification `{}` ({:?})",
        notification.path().display(),
        mask
    );
    Ok(Classification::Ignored)
}

/// Derives the container ID from the name of the directory containing `config_path`.
fn container_id(config_path: &Path) -> Option<ContainerID> {
    let name = config_path.parent()?.file_name()?.to_str()?;
    ContainerID::new(name).ok()
}

async fn read_config(path: &Path, policy: ReadErrorPolicy) -> Option<String> {
    match fsutil::read_to_string(path).await {
        Ok(config) => return Some(config),
        Err(err) if policy == ReadErrorPolicy::RetryOnce => {
            log::debug!("{err}, retrying in {}ms", RETRY_DELAY.as_millis());
        }
        Err(err) => {
            log::warn!("Dropping running transition: {err}");
            return None;
        }
    }

    tokio::time::sleep(RETRY_DELAY).await;
    fsutil::read_to_string(path).await.ok_warn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::LifecycleState;
    use crate::watch::container_mask;
    use crate::watch::testing::FakeRegistrar;

    const ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    struct Fixture {
        root: tempfile::TempDir,
        watches: WatchSet<FakeRegistrar>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let watches = WatchSet::new(root.path(), FakeRegistrar::default());
            Self { root, watches }
        }

        fn container_dir(&self) -> PathBuf {
            let dir = self.root.path().join(ID);
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }
    }

    #[tokio::test]
    async fn test_config_write_is_running() {
        let mut fx = Fixture::new();
        let dir = fx.container_dir();
        std::fs::write(dir.join(CONFIG_FILE_NAME), r#"{"hostname":"c1"}"#).unwrap();

        let n = Notification::new(&dir, CONFIG_FILE_NAME, EventMask::CLOSE_WRITE);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();

        let Classification::Event(ev) = result else {
            panic!("expected event, got {result:?}");
        };
        assert_eq!(ev.container_id().as_str(), ID);
        assert_eq!(ev.state(), LifecycleState::Running);
        assert_eq!(ev.config(), Some(r#"{"hostname":"c1"}"#));
    }

    #[tokio::test]
    async fn test_config_delete_is_stopped() {
        let mut fx = Fixture::new();
        let dir = fx.container_dir();

        let n = Notification::new(&dir, CONFIG_FILE_NAME, EventMask::DELETE);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();

        assert_eq!(
            result,
            Classification::Event(LifecycleEvent::stopped(ContainerID::new(ID).unwrap()))
        );
    }

    #[tokio::test]
    async fn test_unreadable_config_is_dropped() {
        let mut fx = Fixture::new();
        let dir = fx.container_dir();

        let n = Notification::new(&dir, CONFIG_FILE_NAME, EventMask::CLOSE_WRITE);
        for policy in [ReadErrorPolicy::Drop, ReadErrorPolicy::RetryOnce] {
            let result = classify(&n, &mut fx.watches, policy).await.unwrap();
            assert_eq!(result, Classification::Ignored);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_once_reads_late_config() {
        let mut fx = Fixture::new();
        let dir = fx.container_dir();
        let config = dir.join(CONFIG_FILE_NAME);
        let n = Notification::new(&dir, CONFIG_FILE_NAME, EventMask::CLOSE_WRITE);

        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();
        assert_eq!(result, Classification::Ignored);

        // The file shows up between the first read and the retry.
        let writer = tokio::spawn(async move {
            tokio::time::sleep(RETRY_DELAY / 2).await;
            std::fs::write(config, "{}").unwrap();
        });
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::RetryOnce)
            .await
            .unwrap();
        writer.await.unwrap();

        let id = ContainerID::new(ID).unwrap();
        assert_eq!(
            result,
            Classification::Event(LifecycleEvent::running(id, "{}"))
        );
    }

    #[tokio::test]
    async fn test_config_outside_container_directory_is_ignored() {
        let mut fx = Fixture::new();
        let root = fx.root.path().to_path_buf();
        std::fs::write(root.join(CONFIG_FILE_NAME), "{}").unwrap();

        for mask in [EventMask::CLOSE_WRITE, EventMask::DELETE] {
            let n = Notification::new(&root, CONFIG_FILE_NAME, mask);
            let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
                .await
                .unwrap();
            assert_eq!(result, Classification::Ignored);
        }
    }

    #[tokio::test]
    async fn test_other_config_notifications_are_ignored() {
        let mut fx = Fixture::new();
        let dir = fx.container_dir();

        let n = Notification::new(&dir, CONFIG_FILE_NAME, EventMask::CREATE);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();
        assert_eq!(result, Classification::Ignored);

        let n = Notification::new(&dir, "state.json", EventMask::CLOSE_WRITE);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();
        assert_eq!(result, Classification::Ignored);
    }

    #[tokio::test]
    async fn test_new_container_directory_is_watched() {
        let mut fx = Fixture::new();
        let root = fx.root.path().to_path_buf();

        let n = Notification::new(&root, ID, EventMask::CREATE | EventMask::ISDIR);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();

        assert_eq!(result, Classification::Watched(root.join(ID)));
        assert_eq!(
            fx.watches.registrar().added,
            vec![(root.join(ID), container_mask())]
        );
    }

    #[tokio::test]
    async fn test_invalid_directory_names_are_not_watched() {
        let mut fx = Fixture::new();
        let root = fx.root.path().to_path_buf();

        for name in ["abc", "config.json.tmp", &ID[1..]] {
            let n = Notification::new(&root, name, EventMask::CREATE | EventMask::ISDIR);
            let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
                .await
                .unwrap();
            assert_eq!(result, Classification::Ignored);
        }

        // Plain files with a container-shaped name are not directories to watch.
        let n = Notification::new(&root, ID, EventMask::CREATE);
        let result = classify(&n, &mut fx.watches, ReadErrorPolicy::Drop)
            .await
            .unwrap();
        assert_eq!(result, Classification::Ignored);

        assert!(fx.watches.registrar().added.is_empty());
    }

    #[tokio::test]
    async fn test_registration_failure_is_propagated() {
        let root = tempfile::tempdir().unwrap();
        let mut watches = WatchSet::new(root.path(), FakeRegistrar::failing());

        let n = Notification::new(root.path(), ID, EventMask::CREATE | EventMask::ISDIR);
        let err = classify(&n, &mut watches, ReadErrorPolicy::Drop)
            .await
            .unwrap_err();
        assert!(matches!(err, watch::Error::AddWatch { .. }));
        assert!(!watches.is_watched(root.path().join(ID)));
    }

    #[test]
    fn test_read_error_policy_from_str() {
        assert_eq!("drop".parse(), Ok(ReadErrorPolicy::Drop));
        assert_eq!("retry-once".parse(), Ok(ReadErrorPolicy::RetryOnce));
        assert!("never".parse::<ReadErrorPolicy>().is_err());
    }
}
