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
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    backend::Location,
    error::{BackupError, Result},
    process,
    ssh::SshTarget,
    utils::shell_quote,
};

const BTRFS: &str = "btrfs";
const REMOTE_BTRFS: &str = "sudo -n btrfs";

/// The btrfs primitives the backup protocol is built from.
///
/// Locations passed to a single call that must live on the same host
/// (snapshot source and destination, send snapshot and parent, all
/// subvolumes of one delete) are checked by the implementation.
pub trait BtrfsOps: Send + Sync {
    /// True if `location` is an existing directory (or subvolume).
    fn exists(&self, location: &Location) -> Result<bool>;

    /// Takes a read-only snapshot of `src` at `dst`.
    fn snapshot(&self, src: &Location, dst: &Location) -> Result<()>;

    /// Deletes the given subvolumes with a single command per host.
    fn delete(&self, subvolumes: &[Location]) -> Result<()>;

    /// Sends `snapshot` into `dst_dir`, incrementally relative to `parent` if
    /// one is given. The received subvolume keeps the snapshot's name.
    fn send_receive(
        &self,
        snapshot: &Location,
        parent: Option<&Location>,
        dst_dir: &Location,
    ) -> Result<()>;
}

/// [`BtrfsOps`] backed by the `btrfs` command line tool. Remote commands go
/// through SSH and run as `sudo -n btrfs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBtrfs;

fn cross_host(what: &str, a: &Location, b: &Location) -> BackupError {
    BackupError::Transfer(format!("cannot {what} between '{a}' and '{b}'"))
}

fn send_args(snapshot: &Path, parent: Option<&Path>) -> Vec<String> {
    let mut args = vec![String::from("send")];
    if let Some(parent) = parent {
        args.push(String::from("-p"));
        args.push(parent.to_string_lossy().into_owned());
    }
    args.push(snapshot.to_string_lossy().into_owned());
    args
}

fn remote_send_command(snapshot: &SshTarget, parent: Option<&Location>) -> String {
    let mut command = format!("{REMOTE_BTRFS} send");
    if let Some(parent) = parent {
        command.push_str(&format!(" -p {}", shell_quote(parent.path())));
    }
    command.push_str(&format!(" {}", shell_quote(snapshot.path())));
    command
}

impl BtrfsOps for SystemBtrfs {
    fn exists(&self, location: &Location) -> Result<bool> {
        match location {
            Location::Local(path) => Ok(path.is_dir()),
            Location::Remote(target) => target.is_dir(),
        }
    }

    fn snapshot(&self, src: &Location, dst: &Location) -> Result<()> {
        match (src, dst) {
            (Location::Local(src_path), Location::Local(dst_path)) => {
                process::check(
                    Command::new(BTRFS)
                        .args(["subvolume", "snapshot", "-r"])
                        .arg(src_path)
                        .arg(dst_path),
                )?;
                Ok(())
            }
            (Location::Remote(src_target), Location::Remote(_)) if src.same_host(dst) => {
                src_target.check(&format!(
                    "{REMOTE_BTRFS} subvolume snapshot -r {} {}",
                    shell_quote(src.path()),
                    shell_quote(dst.path())
                ))?;
                Ok(())
            }
            _ => Err(cross_host("snapshot", src, dst)),
        }
    }

    fn delete(&self, subvolumes: &[Location]) -> Result<()> {
        let local: Vec<&PathBuf> = subvolumes
            .iter()
            .filter_map(|s| match s {
                Location::Local(path) => Some(path),
                Location::Remote(_) => None,
            })
            .collect();

        if !local.is_empty() {
            process::check(
                Command::new(BTRFS)
                    .args(["subvolume", "delete"])
                    .args(local),
            )?;
        }

        // One command per remote host.
        let mut remote: Vec<(&SshTarget, Vec<String>)> = Vec::new();
        for subvolume in subvolumes {
            if let Location::Remote(target) = subvolume {
                let quoted = shell_quote(target.path());
                match remote.iter_mut().find(|(t, _)| t.same_host(target)) {
                    Some((_, paths)) => paths.push(quoted),
                    None => remote.push((target, vec![quoted])),
                }
            }
        }
        for (target, paths) in remote {
            target.check(&format!(
                "{REMOTE_BTRFS} subvolume delete {}",
                paths.join(" ")
            ))?;
        }

        Ok(())
    }

    fn send_receive(
        &self,
        snapshot: &Location,
        parent: Option<&Location>,
        dst_dir: &Location,
    ) -> Result<()> {
        if let Some(parent) = parent {
            if !parent.same_host(snapshot) {
                return Err(cross_host("use parent", parent, snapshot));
            }
        }

        match (snapshot, dst_dir) {
            (Location::Local(snapshot_path), Location::Local(dst_path)) => process::pipe(
                Command::new(BTRFS).args(send_args(snapshot_path, parent.map(Location::path))),
                Command::new(BTRFS).arg("receive").arg(dst_path),
            ),
            (Location::Local(snapshot_path), Location::Remote(dst_target)) => dst_target.pipe_to(
                Command::new(BTRFS).args(send_args(snapshot_path, parent.map(Location::path))),
                &format!("{REMOTE_BTRFS} receive {}", shell_quote(dst_target.path())),
            ),
            (Location::Remote(snapshot_target), Location::Local(dst_path)) => snapshot_target
                .pipe_from(
                    &remote_send_command(snapshot_target, parent),
                    Command::new(BTRFS).arg("receive").arg(dst_path),
                ),
            (Location::Remote(_), Location::Remote(_)) => {
                Err(cross_host("send", snapshot, dst_dir))
            }
        }
    }
}
