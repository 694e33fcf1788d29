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
    use std::{fs, sync::Arc, thread, time::Duration};

    use anyhow::Result;
    use chrono::Duration as TimeDelta;
    use tempfile::tempdir;

    use yaesm::{
        backend::Location,
        backup::{Backup, collect},
        scheduler::{ManualClock, Scheduler},
        timeframe::Timeframe,
    };

    use crate::integration_tests::{DirBackend, at};

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("timed out waiting for {what}");
    }

    #[test]
    fn test_scheduled_backups_run_and_failures_do_not_stop_others() -> Result<()> {
        let src = tempdir()?;
        let good_dst = tempdir()?;
        let bad_dst = tempdir()?;

        let good = Arc::new(Backup::new(
            "good",
            Arc::new(DirBackend::default()),
            Location::Local(src.path().to_path_buf()),
            Location::Local(good_dst.path().to_path_buf()),
            vec![Timeframe::five_minute(10)],
        )?);
        let failing_backend = Arc::new(DirBackend::failing());
        let bad = Arc::new(Backup::new(
            "bad",
            failing_backend.clone(),
            Location::Local(src.path().to_path_buf()),
            Location::Local(bad_dst.path().to_path_buf()),
            vec![Timeframe::five_minute(10)],
        )?);

        let clock = Arc::new(ManualClock::new(at(2031, 2, 3, 12, 3)));
        let mut scheduler = Scheduler::new(clock.clone()).with_tick(Duration::from_millis(5));
        scheduler.schedule_backups(&[good.clone(), bad.clone()]);
        assert_eq!(scheduler.num_jobs(), 2);

        let handle = scheduler.handle();
        let runner = thread::spawn(move || scheduler.start());

        clock.set(at(2031, 2, 3, 12, 5));
        wait_until("first fire", || {
            failing_backend.transfers() == 1 && fs::read_dir(good_dst.path()).unwrap().count() == 1
        });

        clock.advance(TimeDelta::minutes(5));
        wait_until("second fire", || {
            failing_backend.transfers() == 2 && fs::read_dir(good_dst.path()).unwrap().count() == 2
        });

        handle.stop(false);
        runner.join().unwrap();

        // Named after the scheduler clock, newest first.
        let taken = collect(&good, None)?;
        assert_eq!(
            taken.iter().map(|i| i.basename.timestamp).collect::<Vec<_>>(),
            vec![at(2031, 2, 3, 12, 10), at(2031, 2, 3, 12, 5)]
        );
        assert!(taken.iter().all(|i| i.basename.backup == "good"));
        assert!(collect(&bad, None)?.is_empty());
        Ok(())
    }
}
