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
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::{
    global::defaults::DEFAULT_PIDFILE_PATH,
    scheduler::{LocalClock, Scheduler},
    ui, utils,
};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Pidfile guarding against a second running scheduler
    #[arg(long, value_parser, default_value = DEFAULT_PIDFILE_PATH)]
    pub pidfile: PathBuf,
}

pub fn run(global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let _pidfile = PidFile::acquire(&args.pidfile)?;

    let backups = config.into_backups();
    let mut scheduler = Scheduler::new(Arc::new(LocalClock));
    scheduler.schedule_backups(&backups);

    ui::cli::log!(
        "Scheduling {} ({})",
        utils::format_count(backups.len(), "backup", "backups"),
        utils::format_count(scheduler.num_jobs(), "job", "jobs")
    );

    let handle = scheduler.handle();
    let signals = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if signals.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::info!("stop requested, waiting for running backups (signal again to force)");
            handle.request_stop(false);
        } else {
            tracing::warn!("forced stop requested");
            handle.request_stop(true);
        }
    })
    .context("could not install signal handler")?;

    scheduler.start();
    Ok(())
}

/// Holds the pidfile for as long as it lives.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes our pid to `path`. Fails if the file names a live process;
    /// a stale file is replaced.
    pub fn acquire(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => match content.trim().parse::<u32>() {
                Ok(pid) if process_alive(pid) => {
                    bail!(
                        "yaesm is already running with pid {pid} (pidfile {})",
                        path.display()
                    );
                }
                _ => {
                    tracing::warn!(pidfile = %path.display(), "removing stale pidfile");
                    fs::remove_file(path).with_context(|| {
                        format!("could not remove stale pidfile {}", path.display())
                    })?;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("could not read pidfile {}", path.display()));
            }
        }

        fs::write(path, format!("{}\n", std::process::id()))
            .with_context(|| format!("could not write pidfile {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(pidfile = %self.path.display(), error = %e, "could not remove pidfile");
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks for existence and permission.
    let ret = unsafe { libc::kill(pid, 0) };
    ret == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    false
}
