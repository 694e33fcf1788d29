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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors raised while taking, transferring or pruning backups.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup basename '{0}'")]
    NamingFormat(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("failed to delete old backups: {0}")]
    Retention(String),

    #[error("connection to '{host}' failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("unsupported backend: '{0}'")]
    UnsupportedBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// True for failures that happened while moving data, including an
    /// unreachable remote host.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            BackupError::Transfer(_) | BackupError::Connection { .. }
        )
    }

    pub(crate) fn connection(host: &str, reason: impl ToString) -> Self {
        BackupError::Connection {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }
}
