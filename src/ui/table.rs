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

//! Plain text tables for the `list` and `schedule` commands.

/// Width of `s` on a terminal, not counting ANSI color sequences.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut escaped = false;
    for c in s.chars() {
        match (escaped, c) {
            (false, '\x1b') => escaped = true,
            (false, _) => width += 1,
            (true, 'm') => escaped = false,
            (true, _) => {}
        }
    }
    width
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

enum Row {
    Cells(Vec<String>),
    Separator,
}

#[derive(Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new_with_alignments(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            ..Default::default()
        }
    }

    pub fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(Row::Cells(row));
    }

    /// Adds a horizontal rule between two groups of rows.
    pub fn add_separator(&mut self) {
        self.rows.push(Row::Separator);
    }

    pub fn is_empty(&self) -> bool {
        !self.rows.iter().any(|r| matches!(r, Row::Cells(_)))
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| visible_width(h)).collect();
        for row in &self.rows {
            if let Row::Cells(cells) = row {
                for (i, cell) in cells.iter().enumerate() {
                    match widths.get_mut(i) {
                        Some(w) => *w = (*w).max(visible_width(cell)),
                        None => widths.push(visible_width(cell)),
                    }
                }
            }
        }
        widths
    }

    fn render_cells(&self, cells: &[String], widths: &[usize], out: &mut String) {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let fill = " ".repeat(widths[i] - visible_width(cell));
                match self.alignments.get(i).copied().unwrap_or(Alignment::Left) {
                    Alignment::Left => format!("{cell}{fill}"),
                    Alignment::Right => format!("{fill}{cell}"),
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let rule = format!(
            "{}\n",
            "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1))
        );

        let mut out = String::new();
        if !self.headers.is_empty() {
            self.render_cells(&self.headers, &widths, &mut out);
            out.push_str(&rule);
        }
        for row in &self.rows {
            match row {
                Row::Cells(cells) => self.render_cells(cells, &widths, &mut out),
                Row::Separator => out.push_str(&rule),
            }
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}
