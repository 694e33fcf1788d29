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

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{NaiveDate, NaiveDateTime};

use yaesm::{
    backend::Backend,
    error::{BackupError, Result},
    ssh::SshTarget,
};

mod test_config;
mod test_do_backup;
mod test_scheduler;

pub(crate) fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

/// A backend whose "snapshots" are plain directories.
#[derive(Default)]
pub(crate) struct DirBackend {
    fail_transfers: AtomicBool,
    transfers: AtomicUsize,
}

impl DirBackend {
    pub(crate) fn failing() -> Self {
        let backend = Self::default();
        backend.fail_transfers.store(true, Ordering::SeqCst);
        backend
    }

    pub(crate) fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

impl Backend for DirBackend {
    fn name(&self) -> &'static str {
        "dir"
    }

    fn transfer_local_to_local(
        &self,
        _src_dir: &Path,
        dst_dir: &Path,
        basename: &str,
    ) -> Result<PathBuf> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(BackupError::Transfer(String::from("disk full")));
        }
        let created = dst_dir.join(basename);
        fs::create_dir(&created)?;
        Ok(created)
    }

    fn transfer_local_to_remote(
        &self,
        _src_dir: &Path,
        _dst_dir: &SshTarget,
        _basename: &str,
    ) -> Result<SshTarget> {
        Err(BackupError::UnsupportedBackend(String::from("dir")))
    }

    fn transfer_remote_to_local(
        &self,
        _src_dir: &SshTarget,
        _dst_dir: &Path,
        _basename: &str,
    ) -> Result<PathBuf> {
        Err(BackupError::UnsupportedBackend(String::from("dir")))
    }

    fn delete_local(&self, backups: &[PathBuf]) -> Result<()> {
        for backup in backups {
            fs::remove_dir(backup).map_err(|e| BackupError::Retention(e.to_string()))?;
        }
        Ok(())
    }

    fn delete_remote(&self, _backups: &[SshTarget]) -> Result<()> {
        Err(BackupError::UnsupportedBackend(String::from("dir")))
    }
}
