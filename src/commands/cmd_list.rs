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

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use crate::{
    backup::{Backup, retention},
    global::defaults::DATETIME_DISPLAY_FORMAT,
    timeframe::is_timeframe_name,
    ui::{
        self,
        table::{Alignment, Table},
    },
    utils,
};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Only list backups of this backup
    pub backup: Option<String>,

    /// Only list backups of this timeframe
    #[arg(short, long)]
    pub timeframe: Option<String>,
}

pub fn run(global: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    if let Some(tf) = &args.timeframe {
        if !is_timeframe_name(tf) {
            bail!("unknown timeframe '{tf}'");
        }
    }

    let config = super::load_config(global)?;
    let backups: Vec<&Backup> = match &args.backup {
        Some(name) => vec![super::find_backup(&config, name)?],
        None => config.backups().iter().map(|b| b.as_ref()).collect(),
    };

    let mut table = Table::new_with_alignments(vec![
        Alignment::Left,
        Alignment::Left,
        Alignment::Left,
        Alignment::Left,
    ]);
    table.set_headers(vec![
        "Backup".bold().to_string(),
        "Timeframe".bold().to_string(),
        "Date".bold().to_string(),
        "Location".bold().to_string(),
    ]);

    let mut total = 0;
    for (i, backup) in backups.iter().enumerate() {
        let instances = match &args.timeframe {
            Some(tf) => retention::collect_in(backup.dst_dir(), backup.name(), Some(tf))?,
            None => retention::collect(backup, None)?,
        };
        if instances.is_empty() {
            continue;
        }
        if i > 0 && !table.is_empty() {
            table.add_separator();
        }
        total += instances.len();

        for instance in instances {
            table.add_row(vec![
                backup.name().bold().yellow().to_string(),
                instance.basename.timeframe.clone(),
                instance
                    .basename
                    .timestamp
                    .format(DATETIME_DISPLAY_FORMAT)
                    .to_string(),
                instance.location.to_string(),
            ]);
        }
    }

    if !table.is_empty() {
        println!();
        table.print();
    }
    ui::cli::log!("{}", utils::format_count(total, "backup", "backups"));

    Ok(())
}
