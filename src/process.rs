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
    io,
    process::{Command, Stdio},
    thread,
};

use crate::error::{BackupError, Result};

/// Exit status and captured output of a finished command, local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a non-zero exit into a [`BackupError::Transfer`] describing `what`.
    pub fn check(self, what: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(BackupError::Transfer(describe_failure(
                what,
                self.status,
                &self.stderr,
            )))
        }
    }
}

pub(crate) fn describe_failure(what: &str, status: i32, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("'{what}' exited with status {status}")
    } else {
        format!("'{what}' exited with status {status}: {stderr}")
    }
}

/// Renders a command line for log and error messages.
pub fn display_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `cmd` to completion and captures its output.
pub fn run(cmd: &mut Command) -> Result<CommandOutput> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(cmd, e))?;

    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Runs `cmd` and fails with a transfer error if it exits non-zero.
pub fn check(cmd: &mut Command) -> Result<CommandOutput> {
    let what = display_command(cmd);
    tracing::debug!(command = %what, "running");
    run(cmd)?.check(&what)
}

/// Runs `producer | consumer`. Both sides must succeed.
pub fn pipe(producer: &mut Command, consumer: &mut Command) -> Result<()> {
    let producer_line = display_command(producer);
    let consumer_line = display_command(consumer);
    tracing::debug!(producer = %producer_line, consumer = %consumer_line, "running pipeline");

    let mut producer_child = producer
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(producer, e))?;

    let producer_stdout = producer_child
        .stdout
        .take()
        .ok_or_else(|| BackupError::Transfer(format!("no stdout for '{producer_line}'")))?;

    let consumer_child = consumer
        .stdin(Stdio::from(producer_stdout))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let consumer_child = match consumer_child {
        Ok(child) => child,
        Err(e) => {
            let _ = producer_child.kill();
            let _ = producer_child.wait();
            return Err(spawn_error(consumer, e));
        }
    };

    // The producer's stderr is drained on a separate thread so a chatty
    // producer cannot stall the pipeline.
    let producer_stderr = producer_child.stderr.take();
    let stderr_reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stderr) = producer_stderr {
            let _ = io::Read::read_to_string(&mut stderr, &mut buf);
        }
        buf
    });

    let consumer_output = consumer_child.wait_with_output()?;
    let producer_status = producer_child.wait()?;
    let producer_stderr = stderr_reader.join().unwrap_or_default();

    if !producer_status.success() {
        return Err(BackupError::Transfer(describe_failure(
            &producer_line,
            producer_status.code().unwrap_or(-1),
            &producer_stderr,
        )));
    }
    if !consumer_output.status.success() {
        return Err(BackupError::Transfer(describe_failure(
            &consumer_line,
            consumer_output.status.code().unwrap_or(-1),
            &String::from_utf8_lossy(&consumer_output.stderr),
        )));
    }

    Ok(())
}

fn spawn_error(cmd: &Command, e: io::Error) -> BackupError {
    BackupError::Transfer(format!(
        "failed to execute '{}': {e}",
        display_command(cmd)
    ))
}
