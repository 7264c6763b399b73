// sls-scan - CLI for the Studio Security Scanner API
// Copyright (C) 2024 The sls-scan authors
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

//! Fixed-width box-drawing tables.
//!
//! Every column has a fixed character width. A row whose cells all fit is
//! printed on one line (overlong cells would be abbreviated); otherwise the
//! row is split into `ceil(len / width)` sub-rows and every cell is sliced
//! into width-sized chunks.

use std::io::{self, Write};

/// Width of the horizontal rule framing detail views.
pub const DETAIL_WIDTH: usize = 156;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: usize,
}

pub const fn col(title: &'static str, width: usize) -> Column {
    Column { title, width }
}

#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    columns: &'a [Column],
}

impl<'a> Table<'a> {
    pub const fn new(columns: &'a [Column]) -> Self {
        Self { columns }
    }

    /// Writes the whole table followed by a blank spacer line. Nothing is
    /// written for an empty row set.
    pub fn render(&self, rows: &[Vec<String>], out: &mut dyn Write) -> io::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        writeln!(out, "{}", self.rule('┌', '┬', '┐'))?;
        writeln!(out, "{}", self.header())?;
        writeln!(out, "{}", self.rule('├', '┼', '┤'))?;
        for (index, row) in rows.iter().enumerate() {
            for line in self.row_lines(row) {
                writeln!(out, "{line}")?;
            }
            if index + 1 == rows.len() {
                writeln!(out, "{}", self.rule('└', '┴', '┘'))?;
            } else {
                writeln!(out, "{}", self.rule('├', '┼', '┤'))?;
            }
        }
        writeln!(out, " ")
    }

    pub fn row_lines(&self, row: &[String]) -> Vec<String> {
        let lines = self
            .columns
            .iter()
            .zip(row)
            .map(|(column, cell)| line_count(cell.chars().count(), column.width))
            .max()
            .unwrap_or(0);

        if lines <= 1 {
            let cells = self
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| abbreviate(cell, column.width));
            return vec![self.line(cells)];
        }

        (0..lines)
            .map(|i| {
                let cells = self.columns.iter().zip(row).map(|(column, cell)| {
                    substring(cell, i * column.width, (i + 1) * column.width)
                });
                self.line(cells)
            })
            .collect()
    }

    fn line(&self, cells: impl Iterator<Item = String>) -> String {
        let mut line = String::from("│");
        for (column, cell) in self.columns.iter().zip(cells) {
            line.push_str(&format!(" {:<width$}│", cell, width = column.width));
        }
        line
    }

    fn header(&self) -> String {
        let mut line = String::from("│");
        for column in self.columns {
            line.push_str(&format!(" {:^width$}│", column.title, width = column.width));
        }
        line
    }

    fn rule(&self, left: char, middle: char, right: char) -> String {
        let segments: Vec<String> = self
            .columns
            .iter()
            .map(|column| "─".repeat(column.width + 1))
            .collect();
        format!("{left}{}{right}", segments.join(&middle.to_string()))
    }
}

/// Number of `width`-sized lines needed for `len` characters.
pub fn line_count(len: usize, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    len.div_ceil(width)
}

pub fn abbreviate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return ".".repeat(max);
    }
    let head: String = text.chars().take(max - 3).collect();
    format!("{head}...")
}

/// Characters `start..end` of `text`, trimmed. Out-of-range bounds clamp.
pub fn substring(text: &str, start: usize, end: usize) -> String {
    let slice: String = text
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect();
    slice.trim().to_string()
}

/// Renders `2024-01-02T03:04:05.000Z` as `2024-01-02 03:04:05`.
pub fn format_date_time(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    value
        .replacen('T', " ", 1)
        .replacen('Z', " ", 1)
        .chars()
        .take(19)
        .collect()
}

pub fn rule(width: usize) -> String {
    "─".repeat(width)
}

/// `title` followed by a rule up to `width` characters.
pub fn titled_rule(title: &str, width: usize) -> String {
    let used = title.chars().count();
    format!("{title}{}", rule(width.saturating_sub(used)))
}

/// `key: value` with the key right-aligned, as used by detail views.
pub fn field(key: &str, key_width: usize, value: &str, value_width: usize) -> String {
    format!("{key:>key_width$}: {value:<value_width$}")
}
