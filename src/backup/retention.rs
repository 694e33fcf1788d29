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

use std::fs;

use super::{Backup, naming::BackupBasename};
use crate::{backend::Location, error::Result, timeframe::Timeframe};

/// An existing backup found in a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInstance {
    pub location: Location,
    pub basename: BackupBasename,
}

/// Lists the backups of `backup` in its destination directory, newest first.
/// If `timeframe` is given, only backups of that timeframe are returned.
pub fn collect(backup: &Backup, timeframe: Option<&Timeframe>) -> Result<Vec<BackupInstance>> {
    collect_in(backup.dst_dir(), backup.name(), timeframe.map(Timeframe::name))
}

/// Like [`collect`], for any directory and backup name.
pub fn collect_in(
    dst_dir: &Location,
    backup_name: &str,
    timeframe_name: Option<&str>,
) -> Result<Vec<BackupInstance>> {
    let mut instances: Vec<BackupInstance> = list_subdirs(dst_dir)?
        .into_iter()
        .filter_map(|name| match name.parse::<BackupBasename>() {
            Ok(basename) => Some((name, basename)),
            Err(_) => {
                tracing::debug!(dir = %dst_dir, entry = %name, "skipping foreign entry");
                None
            }
        })
        .filter(|(_, basename)| basename.backup == backup_name)
        .filter(|(_, basename)| timeframe_name.is_none_or(|tf| basename.timeframe == tf))
        .map(|(name, basename)| BackupInstance {
            location: dst_dir.join(name),
            basename,
        })
        .collect();

    sort_newest_first(&mut instances);
    Ok(instances)
}

/// Stable sort by timestamp, newest first.
pub fn sort_newest_first(instances: &mut [BackupInstance]) {
    instances.sort_by(|a, b| b.basename.timestamp.cmp(&a.basename.timestamp));
}

/// Splits off everything past the first `keep` entries of a newest-first list.
pub fn surplus(mut instances: Vec<BackupInstance>, keep: usize) -> Vec<BackupInstance> {
    if instances.len() > keep {
        instances.split_off(keep)
    } else {
        Vec::new()
    }
}

fn list_subdirs(dir: &Location) -> Result<Vec<String>> {
    match dir {
        Location::Local(path) => {
            let mut names = Vec::new();
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                if entry.path().is_dir() {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(names)
        }
        Location::Remote(target) => target.list_dir(),
    }
}
