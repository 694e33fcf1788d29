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

use std::fmt;

use super::ops::BtrfsOps;
use crate::{backend::Location, error::Result, global::defaults::BOOTSTRAP_SNAPSHOT_NAME};

/// The transition taken by [`bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapAction {
    /// Neither side had a bootstrap snapshot. One was taken and sent.
    Created,
    /// Only the source had it. It was sent again.
    Resent,
    /// Only the destination had it. The stale copy was replaced.
    Repaired,
    /// Both sides had it. Nothing was done.
    AlreadyBootstrapped,
}

impl fmt::Display for BootstrapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BootstrapAction::Created => "created",
            BootstrapAction::Resent => "resent",
            BootstrapAction::Repaired => "repaired",
            BootstrapAction::AlreadyBootstrapped => "already bootstrapped",
        };
        write!(f, "{s}")
    }
}

/// Makes sure the bootstrap snapshot is present under both `src_dir` and
/// `dst_dir`, and returns the source side copy to be used as the parent of
/// incremental sends.
pub fn bootstrap<O: BtrfsOps + ?Sized>(
    ops: &O,
    src_dir: &Location,
    dst_dir: &Location,
) -> Result<(Location, BootstrapAction)> {
    let src_bootstrap = src_dir.join(BOOTSTRAP_SNAPSHOT_NAME);
    let dst_bootstrap = dst_dir.join(BOOTSTRAP_SNAPSHOT_NAME);

    let src_exists = ops.exists(&src_bootstrap)?;
    let dst_exists = ops.exists(&dst_bootstrap)?;

    let action = match (src_exists, dst_exists) {
        (false, false) => {
            ops.snapshot(src_dir, &src_bootstrap)?;
            ops.send_receive(&src_bootstrap, None, dst_dir)?;
            BootstrapAction::Created
        }
        (true, false) => {
            ops.send_receive(&src_bootstrap, None, dst_dir)?;
            BootstrapAction::Resent
        }
        (false, true) => {
            tracing::warn!(
                src = %src_bootstrap,
                dst = %dst_bootstrap,
                "bootstrap snapshot missing at source but present at destination, replacing it"
            );
            ops.delete(std::slice::from_ref(&dst_bootstrap))?;
            ops.snapshot(src_dir, &src_bootstrap)?;
            ops.send_receive(&src_bootstrap, None, dst_dir)?;
            BootstrapAction::Repaired
        }
        (true, true) => BootstrapAction::AlreadyBootstrapped,
    };

    Ok((src_bootstrap, action))
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::backend::btrfs::fake::FakeBtrfs;

    fn dirs() -> (Location, Location) {
        (
            Location::Local(PathBuf::from("/data")),
            Location::Local(PathBuf::from("/backups")),
        )
    }

    #[test]
    fn test_bootstrap_from_scratch() -> Result<()> {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();

        let (parent, action) = bootstrap(&ops, &src, &dst)?;
        assert_eq!(action, BootstrapAction::Created);
        assert_eq!(parent, src.join(BOOTSTRAP_SNAPSHOT_NAME));
        assert!(ops.has(&src.join(BOOTSTRAP_SNAPSHOT_NAME)));
        assert!(ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));
        assert_eq!(
            ops.calls(),
            vec![
                "snapshot /data /data/.yaesm-btrfs-bootstrap-snapshot",
                "send /data/.yaesm-btrfs-bootstrap-snapshot -> /backups",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bootstrap_is_idempotent() -> Result<()> {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();

        bootstrap(&ops, &src, &dst)?;
        let calls_after_first = ops.calls().len();

        let (parent, action) = bootstrap(&ops, &src, &dst)?;
        assert_eq!(action, BootstrapAction::AlreadyBootstrapped);
        assert_eq!(parent, src.join(BOOTSTRAP_SNAPSHOT_NAME));
        assert_eq!(ops.calls().len(), calls_after_first);
        assert!(ops.has(&src.join(BOOTSTRAP_SNAPSHOT_NAME)));
        assert!(ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));
        Ok(())
    }

    #[test]
    fn test_bootstrap_resends_missing_destination() -> Result<()> {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();
        ops.add(&src.join(BOOTSTRAP_SNAPSHOT_NAME));

        let (_, action) = bootstrap(&ops, &src, &dst)?;
        assert_eq!(action, BootstrapAction::Resent);
        assert_eq!(
            ops.calls(),
            vec!["send /data/.yaesm-btrfs-bootstrap-snapshot -> /backups"]
        );
        assert!(ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));
        Ok(())
    }

    #[test]
    fn test_bootstrap_repairs_orphaned_destination() -> Result<()> {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();
        ops.add(&dst.join(BOOTSTRAP_SNAPSHOT_NAME));

        let (_, action) = bootstrap(&ops, &src, &dst)?;
        assert_eq!(action, BootstrapAction::Repaired);
        assert_eq!(
            ops.calls(),
            vec![
                "delete /backups/.yaesm-btrfs-bootstrap-snapshot",
                "snapshot /data /data/.yaesm-btrfs-bootstrap-snapshot",
                "send /data/.yaesm-btrfs-bootstrap-snapshot -> /backups",
            ]
        );
        assert!(ops.has(&src.join(BOOTSTRAP_SNAPSHOT_NAME)));
        assert!(ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));

        let (_, action) = bootstrap(&ops, &src, &dst)?;
        assert_eq!(action, BootstrapAction::AlreadyBootstrapped);
        Ok(())
    }

    #[test]
    fn test_unreachable_source_keeps_destination_bootstrap() {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();
        ops.add(&src.join(BOOTSTRAP_SNAPSHOT_NAME));
        ops.add(&dst.join(BOOTSTRAP_SNAPSHOT_NAME));
        ops.unreachable(&src);

        let err = bootstrap(&ops, &src, &dst).unwrap_err();
        assert!(err.is_transfer());
        assert!(ops.calls().is_empty());
        assert!(ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));
    }

    #[test]
    fn test_bootstrap_failure_propagates() {
        let (src, dst) = dirs();
        let ops = FakeBtrfs::new();
        ops.fail_sends(true);

        let err = bootstrap(&ops, &src, &dst).unwrap_err();
        assert!(err.is_transfer());
        assert!(!ops.has(&dst.join(BOOTSTRAP_SNAPSHOT_NAME)));
    }
}
