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

// -- Configuration --
pub const DEFAULT_CONFIG_PATH: &str = "/etc/yaesm/config.yaml";
pub const DEFAULT_PIDFILE_PATH: &str = "/var/run/yaesm.pid";

// -- Naming --
/// Prefix shared by every backup basename.
pub const BASENAME_PREFIX: &str = "yaesm";
/// Timestamp layout used in backup basenames.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H:%M";
/// Name of the btrfs snapshot kept at both ends to seed incremental sends.
pub const BOOTSTRAP_SNAPSHOT_NAME: &str = ".yaesm-btrfs-bootstrap-snapshot";

// -- Scheduling --
/// Days of the year are always mapped through this non-leap year.
pub const YEARDAY_REFERENCE_YEAR: i32 = 1999;
/// How often the scheduler wakes up to look for due triggers, in seconds.
pub const SCHEDULER_TICK_SECS: u64 = 1;
/// A trigger that is found due more than this many seconds late is reported
/// as missed instead of being run.
pub const MISFIRE_GRACE_SECS: i64 = 60;
/// Upper bound, in days, for the search of the next firing time of a trigger.
pub const TRIGGER_SEARCH_HORIZON_DAYS: i64 = 8 * 366;

// -- SSH --
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const SSH_KEEPALIVE_INTERVAL_SECS: u32 = 10;
pub const SSH_TIMEOUT_MS: u32 = 30_000;

// -- Display --
pub const DEFAULT_VERBOSITY: u32 = 1;
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEFAULT_SCHEDULE_PREVIEW_COUNT: usize = 3;
