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

//! In-memory [`BtrfsOps`] that records every call.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use super::ops::BtrfsOps;
use crate::{
    backend::Location,
    error::{BackupError, Result},
};

#[derive(Default)]
pub(crate) struct FakeBtrfs {
    subvolumes: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
    fail_sends: Mutex<bool>,
    other_filesystem: Mutex<Option<String>>,
    unreachable: Mutex<Option<String>>,
}

impl FakeBtrfs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, location: &Location) {
        self.subvolumes.lock().insert(location.to_string());
    }

    pub(crate) fn has(&self, location: &Location) -> bool {
        self.subvolumes.lock().contains(&location.to_string())
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    /// Snapshots into `dir` fail, as if it were on another filesystem.
    pub(crate) fn on_other_filesystem(&self, dir: &Location) {
        *self.other_filesystem.lock() = Some(dir.to_string());
    }

    /// Every call touching `dir` fails with a connection error.
    pub(crate) fn unreachable(&self, dir: &Location) {
        *self.unreachable.lock() = Some(dir.to_string());
    }

    fn check_reachable(&self, location: &Location) -> Result<()> {
        match self.unreachable.lock().as_ref() {
            Some(dir) if location.to_string().starts_with(dir.as_str()) => Err(
                BackupError::connection("fake", format!("cannot stat {location}: permission denied")),
            ),
            _ => Ok(()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

fn fail(msg: String) -> BackupError {
    BackupError::Transfer(msg)
}

impl BtrfsOps for FakeBtrfs {
    fn exists(&self, location: &Location) -> Result<bool> {
        self.check_reachable(location)?;
        Ok(self.has(location))
    }

    fn snapshot(&self, src: &Location, dst: &Location) -> Result<()> {
        self.record(format!("snapshot {src} {dst}"));
        if let Some(dir) = self.other_filesystem.lock().as_ref() {
            if dst.to_string().starts_with(dir.as_str()) {
                return Err(fail(format!("{dst}: invalid cross-device link")));
            }
        }
        if !self.subvolumes.lock().insert(dst.to_string()) {
            return Err(fail(format!("{dst} already exists")));
        }
        Ok(())
    }

    fn delete(&self, subvolumes: &[Location]) -> Result<()> {
        self.record(format!(
            "delete {}",
            subvolumes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        for subvolume in subvolumes {
            self.check_reachable(subvolume)?;
        }
        let mut existing = self.subvolumes.lock();
        for subvolume in subvolumes {
            if !existing.remove(&subvolume.to_string()) {
                return Err(fail(format!("{subvolume} does not exist")));
            }
        }
        Ok(())
    }

    fn send_receive(
        &self,
        snapshot: &Location,
        parent: Option<&Location>,
        dst_dir: &Location,
    ) -> Result<()> {
        match parent {
            Some(parent) => self.record(format!("send {snapshot} -p {parent} -> {dst_dir}")),
            None => self.record(format!("send {snapshot} -> {dst_dir}")),
        }

        if *self.fail_sends.lock() {
            return Err(fail(String::from("btrfs receive exited with status 1")));
        }
        if !self.has(snapshot) {
            return Err(fail(format!("{snapshot} does not exist")));
        }
        if let Some(parent) = parent {
            let name = parent.file_name().unwrap_or_default();
            if !self.has(parent) || !self.has(&dst_dir.join(name)) {
                return Err(fail(format!("parent {parent} not present on both sides")));
            }
        }

        let name = snapshot.file_name().unwrap_or_default();
        if !self.subvolumes.lock().insert(dst_dir.join(name).to_string()) {
            return Err(fail(format!("{snapshot} already received")));
        }
        Ok(())
    }
}
