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

use anyhow::Result;
use chrono::Local;
use clap::Args;
use colored::Colorize;

use crate::{
    global::defaults::{DATETIME_DISPLAY_FORMAT, DEFAULT_SCHEDULE_PREVIEW_COUNT},
    scheduler::upcoming,
    ui::table::{Alignment, Table},
    utils,
};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Number of upcoming backups to show per timeframe
    #[arg(short = 'n', long, default_value_t = DEFAULT_SCHEDULE_PREVIEW_COUNT)]
    pub count: usize,
}

pub fn run(global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let now = Local::now().naive_local();

    let mut table = Table::new_with_alignments(vec![
        Alignment::Left,
        Alignment::Left,
        Alignment::Right,
        Alignment::Left,
        Alignment::Right,
    ]);
    table.set_headers(vec![
        "Backup".bold().to_string(),
        "Timeframe".bold().to_string(),
        "Keep".bold().to_string(),
        "Next".bold().to_string(),
        "In".bold().to_string(),
    ]);

    for (i, backup) in config.backups().iter().enumerate() {
        if i > 0 {
            table.add_separator();
        }
        for timeframe in backup.timeframes() {
            for (n, fire_time) in upcoming(timeframe, now, args.count).into_iter().enumerate() {
                let wait = (fire_time - now).to_std().unwrap_or_default();
                let (name, tf, keep) = if n == 0 {
                    (
                        backup.name().bold().yellow().to_string(),
                        timeframe.name().to_string(),
                        timeframe.keep().to_string(),
                    )
                } else {
                    (String::new(), String::new(), String::new())
                };
                table.add_row(vec![
                    name,
                    tf,
                    keep,
                    fire_time.format(DATETIME_DISPLAY_FORMAT).to_string(),
                    utils::pretty_print_duration(wait),
                ]);
            }
        }
    }

    println!();
    table.print();
    Ok(())
}
