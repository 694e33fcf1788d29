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

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};

use crate::{
    backup::Backup,
    config::Config,
    global::defaults::DEFAULT_CONFIG_PATH,
    logging::LogOptions,
    timeframe::Timeframe,
};

pub mod cmd_backup;
pub mod cmd_list;
pub mod cmd_run;
pub mod cmd_schedule;

// CLI arguments
#[derive(Parser, Debug)]
#[clap(
    version = env!("CARGO_PKG_VERSION"),
    about = "Scheduled incremental backups with btrfs snapshots, locally or over SSH",
)]
pub struct Cli {
    // Subcommand
    #[command(subcommand)]
    pub command: Command,

    // Global arguments
    #[clap(flatten)]
    pub global_args: GlobalArgs,
}

// List of commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scheduler until stopped
    Run(cmd_run::CmdArgs),
    /// Take one backup now
    Backup(cmd_backup::CmdArgs),
    /// List existing backups
    List(cmd_list::CmdArgs),
    /// Show the next scheduled backups
    Schedule(cmd_schedule::CmdArgs),
}

#[derive(Parser, Debug)]
#[clap(group = ArgGroup::new("verbosity_group").multiple(false))]
pub struct GlobalArgs {
    /// Configuration file [default: /etc/yaesm/config.yaml]
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. 'info' or 'yaesm=debug'. RUST_LOG takes precedence
    #[clap(long, value_parser)]
    pub log_level: Option<String>,

    /// Log to stderr (the default if no log file is given)
    #[clap(long, value_parser)]
    pub log_stderr: bool,

    /// Append log events to this file
    #[clap(long, value_parser)]
    pub log_file: Option<PathBuf>,

    /// Disable console output (verbosity = 0)
    #[clap(long, value_parser, group = "verbosity_group")]
    pub quiet: bool,

    /// Set the console verbosity level [0-2]
    #[clap(short = 'v', long, value_parser, group = "verbosity_group")]
    pub verbosity: Option<u32>,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            level: self.log_level.clone(),
            stderr: self.log_stderr,
            log_file: self.log_file.clone(),
        }
    }
}

pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let path = global.config_path();
    Config::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

pub(crate) fn find_backup<'a>(config: &'a Config, name: &str) -> Result<&'a Backup> {
    match config.backup(name) {
        Some(backup) => Ok(backup),
        None => bail!(
            "no backup named '{}' (configured: {})",
            name,
            config
                .backups()
                .iter()
                .map(|b| b.name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub(crate) fn find_timeframe<'a>(backup: &'a Backup, name: &str) -> Result<&'a Timeframe> {
    match backup.timeframe(name) {
        Some(tf) => Ok(tf),
        None => bail!(
            "backup '{}' has no '{}' timeframe (configured: {})",
            backup.name(),
            name,
            backup
                .timeframes()
                .iter()
                .map(|tf| tf.name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub fn run(args: &Cli) -> Result<()> {
    match &args.command {
        Command::Run(cmd_args) => cmd_run::run(&args.global_args, cmd_args),
        Command::Backup(cmd_args) => cmd_backup::run(&args.global_args, cmd_args),
        Command::List(cmd_args) => cmd_list::run(&args.global_args, cmd_args),
        Command::Schedule(cmd_args) => cmd_schedule::run(&args.global_args, cmd_args),
    }
}
