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

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::{backup, ui, utils};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Name of the backup, as in the configuration file
    pub backup: String,

    /// Timeframe to take the backup for (5minute, hourly, daily, ...)
    pub timeframe: String,
}

pub fn run(global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let backup = super::find_backup(&config, &args.backup)?;
    let timeframe = super::find_timeframe(backup, &args.timeframe)?;

    ui::cli::verbose_1!(
        "{} {} -> {} ({})",
        backup.name().bold(),
        backup.src_dir(),
        backup.dst_dir(),
        backup.backend().name()
    );

    let start = Instant::now();
    let created = backup::do_backup(backup, timeframe)
        .with_context(|| format!("{} backup of '{}' failed", timeframe, backup.name()))?;

    ui::cli::log!(
        "{} {} in {}",
        "Created".bold().green(),
        created,
        utils::pretty_print_duration(start.elapsed())
    );

    Ok(())
}
