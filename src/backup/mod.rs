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

pub mod naming;
pub mod retention;

use std::{collections::HashSet, fmt, path::PathBuf, sync::Arc};

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;

use crate::{
    backend::{Backend, Location},
    error::{BackupError, Result},
    ssh::SshTarget,
    timeframe::Timeframe,
};

pub use naming::{BackupBasename, decode, encode, is_valid_backup_name};
pub use retention::{BackupInstance, collect, surplus};

/// Direction of a backup, derived from where its directories live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupType {
    LocalToLocal,
    LocalToRemote,
    RemoteToLocal,
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackupType::LocalToLocal => "local_to_local",
            BackupType::LocalToRemote => "local_to_remote",
            BackupType::RemoteToLocal => "remote_to_local",
        };
        write!(f, "{s}")
    }
}

/// One backup policy: what to back up, where to, with which backend and on
/// which timeframes.
pub struct Backup {
    name: String,
    backend: Arc<dyn Backend>,
    src_dir: Location,
    dst_dir: Location,
    timeframes: Vec<Timeframe>,
    backup_type: BackupType,

    // Held for the whole of `do_backup`.
    lock: Mutex<()>,
}

impl Backup {
    pub fn new(
        name: &str,
        backend: Arc<dyn Backend>,
        src_dir: Location,
        dst_dir: Location,
        timeframes: Vec<Timeframe>,
    ) -> Result<Self> {
        if !is_valid_backup_name(name) {
            return Err(BackupError::InvalidBackup(format!(
                "'{name}' is not a valid backup name"
            )));
        }

        if timeframes.is_empty() {
            return Err(BackupError::InvalidBackup(format!(
                "backup '{name}' has no timeframes"
            )));
        }
        let mut seen = HashSet::new();
        for tf in &timeframes {
            if !seen.insert(tf.name()) {
                return Err(BackupError::InvalidBackup(format!(
                    "backup '{name}' has timeframe '{}' more than once",
                    tf.name()
                )));
            }
        }

        let backup_type = match (&src_dir, &dst_dir) {
            (Location::Local(_), Location::Local(_)) => BackupType::LocalToLocal,
            (Location::Local(_), Location::Remote(_)) => BackupType::LocalToRemote,
            (Location::Remote(_), Location::Local(_)) => BackupType::RemoteToLocal,
            (Location::Remote(_), Location::Remote(_)) => {
                return Err(BackupError::InvalidBackup(format!(
                    "backup '{name}' has both src_dir and dst_dir on remote hosts"
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            backend,
            src_dir,
            dst_dir,
            timeframes,
            backup_type,
            lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn src_dir(&self) -> &Location {
        &self.src_dir
    }

    pub fn dst_dir(&self) -> &Location {
        &self.dst_dir
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// The timeframe of this backup with the given type tag.
    pub fn timeframe(&self, name: &str) -> Option<&Timeframe> {
        self.timeframes.iter().find(|tf| tf.name() == name)
    }

    pub fn backup_type(&self) -> BackupType {
        self.backup_type
    }
}

impl fmt::Debug for Backup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backup")
            .field("name", &self.name)
            .field("backend", &self.backend.name())
            .field("src_dir", &self.src_dir)
            .field("dst_dir", &self.dst_dir)
            .field("timeframes", &self.timeframes)
            .finish()
    }
}

/// Takes a backup of `backup` for `timeframe` now, then deletes the oldest
/// backups of that timeframe beyond its `keep` count.
pub fn do_backup(backup: &Backup, timeframe: &Timeframe) -> Result<Location> {
    do_backup_at(backup, timeframe, Local::now().naive_local())
}

/// [`do_backup`] with an explicit timestamp for the new backup.
///
/// Retention only runs after a successful transfer. Backups of the same
/// [`Backup`] never run concurrently.
pub fn do_backup_at(backup: &Backup, timeframe: &Timeframe, now: NaiveDateTime) -> Result<Location> {
    let _guard = backup.lock.lock();

    let basename = encode(backup.name(), timeframe.name(), now);
    let backend = backup.backend();

    tracing::debug!(
        backup = backup.name(),
        timeframe = timeframe.name(),
        backend = backend.name(),
        %basename,
        "starting backup"
    );

    let created = match (backup.src_dir(), backup.dst_dir()) {
        (Location::Local(src), Location::Local(dst)) => {
            Location::Local(backend.transfer_local_to_local(src, dst, &basename)?)
        }
        (Location::Local(src), Location::Remote(dst)) => {
            Location::Remote(backend.transfer_local_to_remote(src, dst, &basename)?)
        }
        (Location::Remote(src), Location::Local(dst)) => {
            Location::Local(backend.transfer_remote_to_local(src, dst, &basename)?)
        }
        (Location::Remote(_), Location::Remote(_)) => {
            return Err(BackupError::InvalidBackup(format!(
                "backup '{}' has both src_dir and dst_dir on remote hosts",
                backup.name()
            )));
        }
    };

    let existing = collect(backup, Some(timeframe))?;
    let to_delete = surplus(existing, timeframe.keep());

    if !to_delete.is_empty() {
        tracing::debug!(
            backup = backup.name(),
            timeframe = timeframe.name(),
            count = to_delete.len(),
            "deleting old backups"
        );
        match backup.dst_dir() {
            Location::Local(_) => {
                let paths: Vec<PathBuf> = to_delete
                    .iter()
                    .map(|i| i.location.path().to_path_buf())
                    .collect();
                backend.delete_local(&paths)?;
            }
            Location::Remote(_) => {
                let targets: Vec<SshTarget> = to_delete
                    .into_iter()
                    .filter_map(|i| match i.location {
                        Location::Remote(target) => Some(target),
                        Location::Local(_) => None,
                    })
                    .collect();
                backend.delete_remote(&targets)?;
            }
        }
    }

    Ok(created)
}
