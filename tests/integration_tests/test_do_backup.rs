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

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use anyhow::Result;
    use tempfile::tempdir;

    use yaesm::{
        backend::Location,
        backup::{Backup, collect, do_backup_at, encode},
        timeframe::{TimeOfDay, Timeframe},
    };

    use crate::integration_tests::{DirBackend, at};

    fn daily(keep: usize) -> Timeframe {
        Timeframe::daily(keep, [TimeOfDay::new(23, 59).unwrap()]).unwrap()
    }

    #[test]
    fn test_retention_bound() -> Result<()> {
        for keep in 0..=4 {
            for n in 0..=5u32 {
                let src = tempdir()?;
                let dst = tempdir()?;

                let mut existing: Vec<String> = (1..=n)
                    .map(|d| encode("nightly", "daily", at(2031, 1, d, 23, 59)))
                    .collect();
                for name in &existing {
                    fs::create_dir(dst.path().join(name))?;
                }

                let tf = daily(keep);
                let backup = Backup::new(
                    "nightly",
                    Arc::new(DirBackend::default()),
                    Location::Local(src.path().to_path_buf()),
                    Location::Local(dst.path().to_path_buf()),
                    vec![tf.clone()],
                )?;

                do_backup_at(&backup, &tf, at(2031, 2, 3, 23, 59))?;

                existing.push(encode("nightly", "daily", at(2031, 2, 3, 23, 59)));
                existing.reverse();
                existing.truncate(keep);

                let left: Vec<String> = collect(&backup, Some(&tf))?
                    .into_iter()
                    .map(|i| i.basename.to_string())
                    .collect();
                assert_eq!(left.len(), (n as usize + 1).min(keep), "keep={keep} n={n}");
                assert_eq!(left, existing, "keep={keep} n={n}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_failed_transfer_keeps_history() -> Result<()> {
        let src = tempdir()?;
        let dst = tempdir()?;
        for d in 1..=3 {
            fs::create_dir(dst.path().join(encode("nightly", "daily", at(2031, 1, d, 23, 59))))?;
        }

        let backend = Arc::new(DirBackend::failing());
        let tf = daily(1);
        let backup = Backup::new(
            "nightly",
            backend.clone(),
            Location::Local(src.path().to_path_buf()),
            Location::Local(dst.path().to_path_buf()),
            vec![tf.clone()],
        )?;

        let err = do_backup_at(&backup, &tf, at(2031, 2, 3, 23, 59)).unwrap_err();
        assert!(err.is_transfer());
        assert_eq!(backend.transfers(), 1);
        assert_eq!(collect(&backup, Some(&tf))?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_timeframes_are_retained_separately() -> Result<()> {
        let src = tempdir()?;
        let dst = tempdir()?;

        let hourly = Timeframe::hourly(2, [0])?;
        let daily = daily(1);
        let backup = Backup::new(
            "home",
            Arc::new(DirBackend::default()),
            Location::Local(src.path().to_path_buf()),
            Location::Local(dst.path().to_path_buf()),
            vec![hourly.clone(), daily.clone()],
        )?;

        for h in 0..5 {
            do_backup_at(&backup, &hourly, at(2031, 1, 1, h, 0))?;
        }
        do_backup_at(&backup, &daily, at(2031, 1, 1, 23, 59))?;
        do_backup_at(&backup, &daily, at(2031, 1, 2, 23, 59))?;

        assert_eq!(collect(&backup, Some(&hourly))?.len(), 2);
        assert_eq!(collect(&backup, Some(&daily))?.len(), 1);

        let all = collect(&backup, None)?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].basename.timeframe, "daily");
        assert_eq!(all[0].basename.timestamp, at(2031, 1, 2, 23, 59));
        Ok(())
    }
}
