//! Dynamic management of the watched paths below the runtime's container directory.
//!
//! The root directory is watched for newly created entries. Every entry whose name looks like
//! a container identifier is itself watched for `config.json` writes and deletions. The
//! [`WatchSet`] owns all watch targets and is only ever touched by the task consuming the
//! notification stream.
mod error;
mod registrar;
mod set;

pub use error::{Error, Result};
pub use registrar::Registrar;
pub use set::{Notification, WatchSet, WatchTarget, container_mask, root_mask};

#[cfg(test)]
pub(crate) use registrar::testing;
