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

pub mod connection;
pub mod target;

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use parking_lot::Mutex;

pub use connection::SshConnection;
pub use target::SshTargetSpec;

use crate::{error::Result, process::CommandOutput};

/// A path on a remote host, reachable through a shared [`SshConnection`].
#[derive(Clone)]
pub struct SshTarget {
    path: PathBuf,
    conn: Arc<SshConnection>,
}

impl SshTarget {
    pub fn new(conn: Arc<SshConnection>, path: PathBuf) -> Self {
        Self { path, conn }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn host(&self) -> &str {
        self.conn.host()
    }

    pub fn connection(&self) -> &Arc<SshConnection> {
        &self.conn
    }

    /// True if both targets point at the same host.
    pub fn same_host(&self, other: &SshTarget) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn) || self.host() == other.host()
    }

    /// Same host and connection, different path.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: self.conn.clone(),
        }
    }

    /// `self.path().join(name)` on the same host.
    pub fn join(&self, name: impl AsRef<Path>) -> Self {
        self.with_path(self.path.join(name))
    }

    pub fn run(&self, command: &str) -> Result<CommandOutput> {
        self.conn.run(command)
    }

    /// Runs `command` and fails with a transfer error on a non-zero exit.
    pub fn check(&self, command: &str) -> Result<CommandOutput> {
        self.conn.run(command)?.check(command)
    }

    /// Subdirectory names of this target's path.
    pub fn list_dir(&self) -> Result<Vec<String>> {
        self.conn.list_dir(&self.path)
    }

    pub fn is_dir(&self) -> Result<bool> {
        self.conn.is_dir(&self.path)
    }

    pub fn pipe_to(&self, producer: &mut Command, command: &str) -> Result<()> {
        self.conn.pipe_to_remote(producer, command)
    }

    pub fn pipe_from(&self, command: &str, consumer: &mut Command) -> Result<()> {
        self.conn.pipe_from_remote(command, consumer)
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ssh://p{}:{}@{}:{}",
            self.conn.port(),
            self.conn.user(),
            self.conn.host(),
            self.path.display()
        )
    }
}

impl fmt::Debug for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SshTarget({self})")
    }
}

impl PartialEq for SshTarget {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.conn.host() == other.conn.host()
            && self.conn.port() == other.conn.port()
            && self.conn.user() == other.conn.user()
    }
}

impl Eq for SshTarget {}

type ConnectionKey = (String, String, u16, PathBuf);

/// Hands out one shared [`SshConnection`] per (user, host, port, key).
#[derive(Default)]
pub struct SshConnectionCache {
    connections: Mutex<HashMap<ConnectionKey, Arc<SshConnection>>>,
}

impl SshConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `spec` into a target, reusing an existing connection if one
    /// matches.
    pub fn target(&self, spec: &SshTargetSpec, key: &Path) -> SshTarget {
        let user = spec.effective_user();
        let cache_key = (user.clone(), spec.host.clone(), spec.port, key.to_path_buf());

        let conn = self
            .connections
            .lock()
            .entry(cache_key)
            .or_insert_with(|| {
                Arc::new(SshConnection::new(
                    spec.host.clone(),
                    spec.port,
                    user,
                    key.to_path_buf(),
                ))
            })
            .clone();

        SshTarget::new(conn, spec.path.clone())
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
