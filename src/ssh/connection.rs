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
    io::{self, Read},
    net::TcpStream,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use parking_lot::Mutex;
use ssh2::{CheckResult, Channel, ErrorCode, FileStat, KnownHostFileKind, Session};

use crate::{
    error::{BackupError, Result},
    global::defaults::{SSH_KEEPALIVE_INTERVAL_SECS, SSH_TIMEOUT_MS},
    process::{self, CommandOutput, describe_failure},
};

/// A lazily established, reusable SSH session to one (user, host, port) with
/// one private key.
pub struct SshConnection {
    host: String,
    port: u16,
    user: String,
    key: PathBuf,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("key", &self.key)
            .field("connected", &self.session.lock().is_some())
            .finish()
    }
}

impl SshConnection {
    pub fn new(host: String, port: u16, user: String, key: PathBuf) -> Self {
        Self {
            host,
            port,
            user,
            key,
            session: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn key(&self) -> &Path {
        &self.key
    }

    fn connection_error(&self, reason: impl ToString) -> BackupError {
        BackupError::connection(&self.host, reason)
    }

    /// Returns the current session, connecting first if needed.
    fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock();
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.connect()?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Drops the cached session so the next call reconnects.
    fn reset(&self) {
        if self.session.lock().take().is_some() {
            tracing::debug!(host = %self.host, "dropping SSH session");
        }
    }

    fn connect(&self) -> Result<Session> {
        tracing::debug!(host = %self.host, port = self.port, user = %self.user, "connecting");

        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| self.connection_error(e))?;

        let mut session = Session::new().map_err(|e| self.connection_error(e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(SSH_TIMEOUT_MS);
        session
            .handshake()
            .map_err(|e| self.connection_error(format!("handshake failed: {e}")))?;

        self.verify_host_key(&session)?;

        session
            .userauth_pubkey_file(&self.user, None, &self.key, None)
            .map_err(|e| {
                self.connection_error(format!(
                    "public key authentication as '{}' with {} failed: {e}",
                    self.user,
                    self.key.display()
                ))
            })?;
        if !session.authenticated() {
            return Err(self.connection_error("authentication failed"));
        }

        session.set_keepalive(true, SSH_KEEPALIVE_INTERVAL_SECS);
        // Long-running btrfs commands can stay silent for a long time.
        session.set_timeout(0);

        Ok(session)
    }

    /// Strict host key checking against the user's `known_hosts`.
    fn verify_host_key(&self, session: &Session) -> Result<()> {
        let (key, _) = session
            .host_key()
            .ok_or_else(|| self.connection_error("server sent no host key"))?;

        let mut known_hosts = session
            .known_hosts()
            .map_err(|e| self.connection_error(e))?;

        let known_hosts_file = known_hosts_path()
            .ok_or_else(|| self.connection_error("cannot locate ~/.ssh/known_hosts"))?;
        known_hosts
            .read_file(&known_hosts_file, KnownHostFileKind::OpenSSH)
            .map_err(|e| {
                self.connection_error(format!(
                    "failed to read {}: {e}",
                    known_hosts_file.display()
                ))
            })?;

        match known_hosts.check_port(&self.host, self.port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::NotFound => Err(self.connection_error(format!(
                "host key not found in {}",
                known_hosts_file.display()
            ))),
            CheckResult::Mismatch => Err(self.connection_error("host key mismatch")),
            CheckResult::Failure => Err(self.connection_error("host key check failed")),
        }
    }

    /// Runs `f` with a live session. If `f` fails at the SSH level the session
    /// is discarded.
    fn with_session<T>(&self, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        let session = self.session()?;
        let result = f(&session);
        if let Err(BackupError::Connection { .. }) = &result {
            self.reset();
        }
        result
    }

    fn open_exec(&self, session: &Session, command: &str) -> Result<Channel> {
        let mut channel = session
            .channel_session()
            .map_err(|e| self.connection_error(e))?;
        channel
            .exec(command)
            .map_err(|e| self.connection_error(e))?;
        Ok(channel)
    }

    fn finish(&self, mut channel: Channel, stdout: String) -> Result<CommandOutput> {
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| self.connection_error(e))?;
        channel.wait_close().map_err(|e| self.connection_error(e))?;
        let status = channel.exit_status().map_err(|e| self.connection_error(e))?;
        Ok(CommandOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Runs `command` on the remote host.
    pub fn run(&self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(host = %self.host, command, "running remote command");
        self.with_session(|session| {
            let mut channel = self.open_exec(session, command)?;
            let mut stdout = String::new();
            channel
                .read_to_string(&mut stdout)
                .map_err(|e| self.connection_error(e))?;
            self.finish(channel, stdout)
        })
    }

    /// Names of the subdirectories of `path` on the remote host.
    pub fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        self.with_session(|session| {
            let sftp = session.sftp().map_err(|e| self.connection_error(e))?;
            let entries = sftp.readdir(path).map_err(|e| {
                BackupError::Io(io::Error::other(format!(
                    "cannot list {}:{}: {e}",
                    self.host,
                    path.display()
                )))
            })?;
            Ok(entries
                .into_iter()
                .filter(|(_, stat)| stat.is_dir())
                .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect())
        })
    }

    /// True if `path` is an existing directory on the remote host.
    pub fn is_dir(&self, path: &Path) -> Result<bool> {
        self.with_session(|session| {
            let sftp = session.sftp().map_err(|e| self.connection_error(e))?;
            stat_is_dir(sftp.stat(path), &self.host, path)
        })
    }

    /// Runs `producer | <remote command>`.
    pub fn pipe_to_remote(&self, producer: &mut Command, command: &str) -> Result<()> {
        let producer_line = process::display_command(producer);
        tracing::debug!(producer = %producer_line, host = %self.host, command, "streaming to remote");

        let mut child = producer
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackupError::Transfer(format!("failed to execute '{producer_line}': {e}"))
            })?;

        let producer_stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || read_all(producer_stderr));

        let remote = self.with_session(|session| {
            let mut channel = self.open_exec(session, command)?;
            if let Some(mut stdout) = child.stdout.take() {
                io::copy(&mut stdout, &mut channel).map_err(|e| self.connection_error(e))?;
            }
            channel.send_eof().map_err(|e| self.connection_error(e))?;
            let mut out = String::new();
            channel
                .read_to_string(&mut out)
                .map_err(|e| self.connection_error(e))?;
            self.finish(channel, out)
        });

        if remote.is_err() {
            let _ = child.kill();
        }
        let status = child.wait()?;
        let producer_stderr = stderr_reader.join().unwrap_or_default();

        remote?.check(command)?;
        if !status.success() {
            return Err(BackupError::Transfer(describe_failure(
                &producer_line,
                status.code().unwrap_or(-1),
                &producer_stderr,
            )));
        }
        Ok(())
    }

    /// Runs `<remote command> | consumer`.
    pub fn pipe_from_remote(&self, command: &str, consumer: &mut Command) -> Result<()> {
        let consumer_line = process::display_command(consumer);
        tracing::debug!(host = %self.host, command, consumer = %consumer_line, "streaming from remote");

        let mut child = consumer
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackupError::Transfer(format!("failed to execute '{consumer_line}': {e}"))
            })?;

        let consumer_stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || read_all(consumer_stderr));
        let consumer_stdout = child.stdout.take();
        let stdout_reader = thread::spawn(move || read_all(consumer_stdout));

        let remote = self.with_session(|session| {
            let mut channel = self.open_exec(session, command)?;
            if let Some(mut stdin) = child.stdin.take() {
                // A consumer that exits early closes the pipe; its own exit
                // status reports the failure.
                if let Err(e) = io::copy(&mut channel, &mut stdin) {
                    tracing::debug!(error = %e, "consumer stopped reading");
                }
            }
            self.finish(channel, String::new())
        });

        if remote.is_err() {
            let _ = child.kill();
        }
        let status = child.wait()?;
        let consumer_stderr = stderr_reader.join().unwrap_or_default();
        let _ = stdout_reader.join();

        remote?.check(command)?;
        if !status.success() {
            return Err(BackupError::Transfer(describe_failure(
                &consumer_line,
                status.code().unwrap_or(-1),
                &consumer_stderr,
            )));
        }
        Ok(())
    }
}

fn read_all<R: Read>(reader: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = reader {
        let _ = r.read_to_string(&mut buf);
    }
    buf
}

fn known_hosts_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
}

/// `LIBSSH2_FX_NO_SUCH_FILE`
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Only a missing path counts as "not a directory". Any other stat failure
/// is reported, since callers act on the answer.
fn stat_is_dir(
    stat: std::result::Result<FileStat, ssh2::Error>,
    host: &str,
    path: &Path,
) -> Result<bool> {
    match stat {
        Ok(stat) => Ok(stat.is_dir()),
        Err(e) if e.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => Ok(false),
        Err(e) => Err(BackupError::connection(
            host,
            format!("cannot stat {}: {e}", path.display()),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dir_stat() -> FileStat {
        FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(0o040755),
            atime: None,
            mtime: None,
        }
    }

    #[test]
    fn test_stat_is_dir() -> Result<()> {
        let path = Path::new("/backups/.yaesm-bootstrap");
        assert!(stat_is_dir(Ok(dir_stat()), "host", path)?);

        let file = FileStat {
            perm: Some(0o100644),
            ..dir_stat()
        };
        assert!(!stat_is_dir(Ok(file), "host", path)?);

        let missing = ssh2::Error::new(ErrorCode::SFTP(SFTP_NO_SUCH_FILE), "no such file");
        assert!(!stat_is_dir(Err(missing), "host", path)?);
        Ok(())
    }

    #[test]
    fn test_stat_failure_is_not_absence() {
        let path = Path::new("/backups/.yaesm-bootstrap");
        // LIBSSH2_FX_PERMISSION_DENIED
        let denied = ssh2::Error::new(ErrorCode::SFTP(3), "permission denied");
        let err = stat_is_dir(Err(denied), "host", path).unwrap_err();
        assert!(matches!(err, BackupError::Connection { ref host, .. } if host == "host"));

        let dropped = ssh2::Error::new(ErrorCode::Session(-7), "socket send failed");
        assert!(stat_is_dir(Err(dropped), "host", path).is_err());
    }
}
