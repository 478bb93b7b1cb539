use std::fmt;
use std::hash::Hash;
use std::io;
use std::path::Path;

use inotify::{WatchDescriptor, WatchMask, Watches};

/// Registers watches with the notification facility.
pub trait Registrar {
    /// Identifies a registered watch in subsequent notifications.
    type Descriptor: Clone + Eq + Hash + fmt::Debug;

    /// Starts watching `path` for the events selected by `mask`.
    ///
    /// Watching a path that is already watched replaces its mask and returns the same
    /// descriptor.
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<Self::Descriptor>;
}

impl Registrar for Watches {
    type Descriptor = WatchDescriptor;

    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<WatchDescriptor> {
        self.add(path, mask)
    }
}
