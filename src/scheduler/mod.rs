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

//! Timeframe driven job scheduler.
//!
//! A single dispatch loop owns the table of jobs and their next fire times.
//! Due jobs run on their own worker threads, so a slow backup never delays
//! the others. Job failures are logged and never stop the schedule.

pub mod clock;
pub mod trigger;

use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveDateTime;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

pub use clock::{Clock, LocalClock, ManualClock};
pub use trigger::{Trigger, next_fire, triggers_for, upcoming};

use crate::{
    backup::{Backup, do_backup_at},
    error::Result,
    global::defaults::{DATETIME_DISPLAY_FORMAT, MISFIRE_GRACE_SECS, SCHEDULER_TICK_SECS},
    timeframe::Timeframe,
};

/// A job receives the scheduler clock's reading at dispatch time.
pub type Job = Arc<dyn Fn(NaiveDateTime) -> Result<()> + Send + Sync>;

struct Entry {
    backup: String,
    timeframe: &'static str,
    triggers: Vec<Trigger>,
    job: Job,
}

/// Stops a running [`Scheduler`] from another thread or a signal handler.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop_tx: Sender<bool>,
    done_rx: Receiver<()>,
}

impl SchedulerHandle {
    /// Asks the scheduler to stop and returns immediately.
    pub fn request_stop(&self, force: bool) {
        let _ = self.stop_tx.send(force);
    }

    /// Asks the scheduler to stop and blocks until [`Scheduler::start`]
    /// has returned. Unless `force` is set, that includes waiting for every
    /// running job.
    pub fn stop(&self, force: bool) {
        self.request_stop(force);
        // Disconnects once the dispatch loop is gone.
        let _ = self.done_rx.recv();
    }
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    tick: Duration,
    entries: Vec<Entry>,
    stop_tx: Sender<bool>,
    stop_rx: Receiver<bool>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::unbounded();
        let (done_tx, done_rx) = crossbeam_channel::bounded(0);
        Self {
            clock,
            tick: Duration::from_secs(SCHEDULER_TICK_SECS),
            entries: Vec::new(),
            stop_tx,
            stop_rx,
            done_tx,
            done_rx,
        }
    }

    /// Sets how often the dispatch loop wakes up.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            stop_tx: self.stop_tx.clone(),
            done_rx: self.done_rx.clone(),
        }
    }

    /// Registers a backup of `backup` on the triggers of `timeframe`. Backups
    /// are named after the scheduler clock, not the system one.
    pub fn schedule(&mut self, backup: Arc<Backup>, timeframe: Timeframe) {
        let name = backup.name().to_string();
        let tf = timeframe.clone();
        self.add_job(&name, &timeframe, move |now| {
            do_backup_at(&backup, &tf, now).map(|_| ())
        });
    }

    /// Schedules every timeframe of every backup.
    pub fn schedule_backups(&mut self, backups: &[Arc<Backup>]) {
        for backup in backups {
            for timeframe in backup.timeframes() {
                self.schedule(backup.clone(), timeframe.clone());
            }
        }
    }

    /// Registers an arbitrary job under a (backup, timeframe) label.
    pub fn add_job<F>(&mut self, backup: &str, timeframe: &Timeframe, job: F)
    where
        F: Fn(NaiveDateTime) -> Result<()> + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            backup: backup.to_string(),
            timeframe: timeframe.name(),
            triggers: triggers_for(timeframe),
            job: Arc::new(job),
        });
    }

    pub fn num_jobs(&self) -> usize {
        self.entries.len()
    }

    /// Runs the dispatch loop until a stop is requested through a
    /// [`SchedulerHandle`].
    pub fn start(self) {
        let Scheduler {
            clock,
            tick,
            entries,
            stop_rx,
            done_tx,
            ..
        } = self;

        let mut queue: BinaryHeap<Reverse<(NaiveDateTime, usize)>> = BinaryHeap::new();
        let now = clock.now();
        for (i, entry) in entries.iter().enumerate() {
            arm(&mut queue, entry, i, now);
        }

        tracing::info!(jobs = entries.len(), "scheduler started");

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let force = loop {
            match stop_rx.recv_timeout(tick) {
                Ok(force) => break force,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break false,
            }

            reap(&mut workers);

            let now = clock.now();
            while let Some(Reverse((fire_time, i))) = queue.peek().copied() {
                if fire_time > now {
                    break;
                }
                queue.pop();
                let entry = &entries[i];

                if (now - fire_time).num_seconds() > MISFIRE_GRACE_SECS {
                    tracing::error!(
                        backup = %entry.backup,
                        timeframe = entry.timeframe,
                        scheduled = %fire_time.format(DATETIME_DISPLAY_FORMAT),
                        "missed backup"
                    );
                    arm(&mut queue, entry, i, now);
                    continue;
                }

                if let Some(worker) = dispatch(entry, now) {
                    workers.push(worker);
                }
                arm(&mut queue, entry, i, fire_time);
            }
        };

        // A forced stop may still arrive while waiting for running jobs.
        let mut force = force;
        if !force {
            tracing::info!(running = workers.len(), "scheduler stopping");
            loop {
                reap(&mut workers);
                if workers.is_empty() {
                    break;
                }
                if let Ok(true) = stop_rx.recv_timeout(tick) {
                    force = true;
                    break;
                }
            }
        }

        if force {
            tracing::info!(
                running = workers.iter().filter(|w| !w.is_finished()).count(),
                "scheduler stopped without waiting for running backups"
            );
        } else {
            tracing::info!("scheduler stopped");
        }

        drop(done_tx);
    }
}

fn arm(
    queue: &mut BinaryHeap<Reverse<(NaiveDateTime, usize)>>,
    entry: &Entry,
    index: usize,
    after: NaiveDateTime,
) {
    match next_fire(&entry.triggers, after) {
        Some(t) => queue.push(Reverse((t, index))),
        None => tracing::warn!(
            backup = %entry.backup,
            timeframe = entry.timeframe,
            "timeframe never fires"
        ),
    }
}

fn dispatch(entry: &Entry, now: NaiveDateTime) -> Option<JoinHandle<()>> {
    let job = entry.job.clone();
    let backup = entry.backup.clone();
    let timeframe = entry.timeframe;

    let spawned = thread::Builder::new()
        .name(format!("{backup}-{timeframe}"))
        .spawn(move || match job(now) {
            Ok(()) => tracing::info!(%backup, timeframe, "backup finished"),
            Err(e) => tracing::error!(%backup, timeframe, error = %e, "backup failed"),
        });

    match spawned {
        Ok(worker) => Some(worker),
        Err(e) => {
            tracing::error!(
                backup = %entry.backup,
                timeframe,
                error = %e,
                "could not start backup thread"
            );
            None
        }
    }
}

fn reap(workers: &mut Vec<JoinHandle<()>>) {
    let mut running = Vec::with_capacity(workers.len());
    for worker in workers.drain(..) {
        if worker.is_finished() {
            if worker.join().is_err() {
                tracing::error!("backup thread panicked");
            }
        } else {
            running.push(worker);
        }
    }
    *workers = running;
}
