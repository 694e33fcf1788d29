// yaesm is a scheduled incremental backup tool
// Copyright (C) 2026  The yaesm authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub mod btrfs;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(test)]
use mockall::automock;

use crate::{
    error::{BackupError, Result},
    ssh::SshTarget,
};

/// Abstraction of a backup execution backend.
///
/// A backend knows how to move a snapshot of a source directory into a
/// destination directory for one storage technology, and how to delete
/// backups it created. It never decides names or how many backups to keep;
/// that is done by [`crate::backup::do_backup`].
#[cfg_attr(test, automock)]
pub trait Backend: Send + Sync {
    /// Name under which the backend is registered.
    fn name(&self) -> &'static str;

    /// Creates `<dst_dir>/<basename>` from the local `src_dir`.
    fn transfer_local_to_local(&self, src_dir: &Path, dst_dir: &Path, basename: &str)
    -> Result<PathBuf>;

    /// Creates `<dst_dir>/<basename>` on the remote host from the local `src_dir`.
    fn transfer_local_to_remote(
        &self,
        src_dir: &Path,
        dst_dir: &SshTarget,
        basename: &str,
    ) -> Result<SshTarget>;

    /// Creates the local `<dst_dir>/<basename>` from `src_dir` on the remote host.
    fn transfer_remote_to_local(
        &self,
        src_dir: &SshTarget,
        dst_dir: &Path,
        basename: &str,
    ) -> Result<PathBuf>;

    /// Deletes local backups.
    fn delete_local(&self, backups: &[PathBuf]) -> Result<()>;

    /// Deletes remote backups. All of them live on the same host.
    fn delete_remote(&self, backups: &[SshTarget]) -> Result<()>;
}

type BackendConstructor = fn() -> Arc<dyn Backend>;

/// Every backend that can be named in a configuration file.
const BACKENDS: &[(&str, BackendConstructor)] = &[("btrfs", new_btrfs_backend)];

fn new_btrfs_backend() -> Arc<dyn Backend> {
    Arc::new(btrfs::BtrfsBackend::system())
}

/// Names of all registered backends.
pub fn backend_names() -> impl Iterator<Item = &'static str> {
    BACKENDS.iter().map(|(name, _)| *name)
}

/// Builds the backend registered under `name`.
pub fn backend_from_name(name: &str) -> Result<Arc<dyn Backend>> {
    BACKENDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, new_backend)| new_backend())
        .ok_or_else(|| BackupError::UnsupportedBackend(name.to_string()))
}

/// A directory that is either on this machine or on a remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(SshTarget),
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            Location::Local(path) => path,
            Location::Remote(target) => target.path(),
        }
    }

    /// Appends `name` to the path, staying on the same host.
    pub fn join(&self, name: impl AsRef<Path>) -> Location {
        match self {
            Location::Local(path) => Location::Local(path.join(name)),
            Location::Remote(target) => Location::Remote(target.join(name)),
        }
    }

    /// Last component of the path.
    pub fn file_name(&self) -> Option<String> {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// True if both locations are on the same machine.
    pub fn same_host(&self, other: &Location) -> bool {
        match (self, other) {
            (Location::Local(_), Location::Local(_)) => true,
            (Location::Remote(a), Location::Remote(b)) => a.same_host(b),
            _ => false,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(target) => write!(f, "{target}"),
        }
    }
}
