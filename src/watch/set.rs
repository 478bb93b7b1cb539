use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use inotify::{EventMask, WatchMask};

use super::{Error, Registrar, Result};
use crate::container::is_container_id_shape;

/// Mask registered on the runtime's container directory.
pub fn root_mask() -> WatchMask {
    WatchMask::CREATE | WatchMask::ONLYDIR
}

/// Mask registered on each container state directory.
pub fn container_mask() -> WatchMask {
    WatchMask::CLOSE_WRITE | WatchMask::DELETE
}

/// A path under observation and the mask it was registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
    mask: WatchMask,
}

impl WatchTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mask(&self) -> WatchMask {
        self.mask
    }
}

/// A raw notification resolved to the absolute path of the entry it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    path: PathBuf,
    name: OsString,
    mask: EventMask,
}

impl Notification {
    /// Builds a notification for the entry `name` inside the watched directory `dir`.
    pub fn new(dir: impl AsRef<Path>, name: impl Into<OsString>, mask: EventMask) -> Self {
        let name = name.into();
        Self {
            path: dir.as_ref().join(&name),
            name,
            mask,
        }
    }

    /// Absolute path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the entry relative to the watched directory.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// The watched directory the entry lives in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn mask(&self) -> EventMask {
        self.mask
    }
}

/// The set of watched paths.
///
/// Owns the [`Registrar`] and the mapping from watch descriptors back to the paths they were
/// registered for. Not thread safe; a single task drives it.
pub struct WatchSet<R: Registrar> {
    root: PathBuf,
    registrar: R,
    targets: HashMap<R::Descriptor, WatchTarget>,
}

impl<R: Registrar> WatchSet<R> {
    pub fn new(root: impl Into<PathBuf>, registrar: R) -> Self {
        Self {
            root: root.into(),
            registrar,
            targets: HashMap::new(),
        }
    }

    /// The runtime's container directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of paths currently watched.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns true if `path` is a watch target.
    pub fn is_watched(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.targets.values().any(|t| t.path == path)
    }

    /// Watches the root for new container directories and every container directory that
    /// already exists below it.
    ///
    /// Containers that were started before this call are watched from now on, but their
    /// running transition is not replayed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddWatch`] if any registration fails and [`Error::ReadDir`] if the root
    /// cannot be listed.
    pub async fn watch_existing(&mut self) -> Result<usize> {
        let root = self.root.clone();
        self.add(&root, root_mask())?;

        let read_dir_err = |source: std::io::Error| Error::ReadDir {
            path: root.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&root).await.map_err(read_dir_err)?;

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            let name = entry.file_name();
            if is_dir && name.to_str().is_some_and(is_container_id_shape) {
                self.add(&entry.path(), container_mask())?;
                count += 1;
            }
        }

        log::debug!(
            "Watching {} existing container directories in `{}`",
            count,
            root.display()
        );
        Ok(count)
    }

    /// Watches `path` if it names a container directory directly under the root.
    ///
    /// Returns `Ok(true)` if a watch was registered and `Ok(false)` if `path` was ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddWatch`] if the registration fails.
    pub fn consider_path(&mut self, path: &Path, name: &OsStr) -> Result<bool> {
        if path.parent() != Some(self.root.as_path()) {
            return Ok(false);
        }
        if !name.to_str().is_some_and(is_container_id_shape) {
            return Ok(false);
        }

        self.add(path, container_mask())?;
        log::debug!("Watching new container directory `{}`", path.display());
        Ok(true)
    }

    /// Resolves a raw notification for watch `wd` into the path it refers to.
    ///
    /// Returns `None` for notifications that do not name an entry, for unknown descriptors,
    /// and when the kernel reports the watch as removed (in which case the target is
    /// forgotten).
    pub fn resolve(
        &mut self,
        wd: &R::Descriptor,
        mask: EventMask,
        name: Option<OsString>,
    ) -> Option<Notification> {
        if mask.contains(EventMask::IGNORED) {
            if let Some(target) = self.targets.remove(wd) {
                log::debug!("Watch on `{}` removed", target.path.display());
            }
            return None;
        }

        let Some(target) = self.targets.get(wd) else {
            log::trace!("Notification for unknown watch {:?}", wd);
            return None;
        };

        Some(Notification::new(&target.path, name?, mask))
    }

    fn add(&mut self, path: &Path, mask: WatchMask) -> Result<()> {
        let wd = self
            .registrar
            .add_watch(path, mask)
            .map_err(|source| Error::AddWatch {
                path: path.to_path_buf(),
                source,
            })?;
        self.targets.insert(
            wd,
            WatchTarget {
                path: path.to_path_buf(),
                mask,
            },
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn registrar(&self) -> &R {
        &self.registrar
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeRegistrar;
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_consider_path_registers_container_directory() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::default());
        let path = Path::new("/run/oci").join(ID);

        assert!(set.consider_path(&path, OsStr::new(ID)).unwrap());
        assert!(set.is_watched(&path));
        assert_eq!(set.registrar().added, vec![(path, container_mask())]);
    }

    #[test]
    fn test_consider_path_ignores_other_names() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::default());

        let too_long = format!("{ID}0");
        for name in ["tmp", "config.json", &ID[..63], too_long.as_str()] {
            let path = Path::new("/run/oci").join(name);
            assert!(!set.consider_path(&path, OsStr::new(name)).unwrap());
        }
        assert!(set.is_empty());
        assert!(set.registrar().added.is_empty());
    }

    #[test]
    fn test_consider_path_ignores_nested_directories() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::default());
        let path = Path::new("/run/oci/other").join(ID);

        assert!(!set.consider_path(&path, OsStr::new(ID)).unwrap());
        assert!(set.is_empty());
    }

    #[test]
    fn test_consider_path_propagates_registration_failure() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::failing());
        let path = Path::new("/run/oci").join(ID);

        let err = set.consider_path(&path, OsStr::new(ID)).unwrap_err();
        assert!(matches!(err, Error::AddWatch { path: p, .. } if p == path));
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_watch_existing_registers_root_and_container_directories() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join(ID)).unwrap();
        std::fs::create_dir(root.path().join("not-a-container")).unwrap();
        let other_id = ID.replace('0', "f");
        std::fs::write(root.path().join(&other_id), b"plain file").unwrap();

        let mut set = WatchSet::new(root.path(), FakeRegistrar::default());
        assert_eq!(set.watch_existing().await.unwrap(), 1);

        assert_eq!(set.len(), 2);
        assert!(set.is_watched(root.path()));
        assert!(set.is_watched(root.path().join(ID)));
        assert_eq!(set.registrar().added[0], (root.path().to_path_buf(), root_mask()));
    }

    #[tokio::test]
    async fn test_watch_existing_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");

        // The fake registrar accepts any path, so listing the root is what fails.
        let mut set = WatchSet::new(&missing, FakeRegistrar::default());
        assert!(matches!(
            set.watch_existing().await.unwrap_err(),
            Error::ReadDir { .. }
        ));
    }

    #[test]
    fn test_resolve_joins_watched_directory_and_name() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::default());
        let dir = Path::new("/run/oci").join(ID);
        set.consider_path(&dir, OsStr::new(ID)).unwrap();

        let n = set
            .resolve(&0, EventMask::CLOSE_WRITE, Some("config.json".into()))
            .unwrap();
        assert_eq!(n.path(), dir.join("config.json"));
        assert_eq!(n.dir(), dir);
        assert_eq!(n.name(), "config.json");
        assert_eq!(n.mask(), EventMask::CLOSE_WRITE);

        assert!(set.resolve(&0, EventMask::CLOSE_WRITE, None).is_none());
        assert!(set.resolve(&7, EventMask::CLOSE_WRITE, Some("x".into())).is_none());
    }

    #[test]
    fn test_resolve_forgets_ignored_watches() {
        let mut set = WatchSet::new("/run/oci", FakeRegistrar::default());
        let dir = Path::new("/run/oci").join(ID);
        set.consider_path(&dir, OsStr::new(ID)).unwrap();

        assert!(set.resolve(&0, EventMask::IGNORED, None).is_none());
        assert!(!set.is_watched(&dir));
    }
}
