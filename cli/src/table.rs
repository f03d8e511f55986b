// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::marker::PhantomData;

use colored::{Color, Colorize};
use unicode_width::UnicodeWidthStr;

pub struct Table<'a, T, C: Column<T>> {
    pub columns: &'a [C],
    pub data: &'a [T],
    pub separator: &'static str,
    pub padding: bool,
}

impl<'a, T, C: Column<T>> Table<'a, T, C> {
    pub fn new(columns: &'a [C], data: &'a [T]) -> Self {
        Self {
            columns,
            data,
            separator: "  ",
            padding: true,
        }
    }

    fn compute_columns(&self, table: &[Vec<String>]) -> Vec<ColumnStylizer<'_, T, C>> {
        let max_lengths = self.padding.then(|| get_column_max_width(table));

        let mut columns = Vec::with_capacity(self.columns.len());
        for (i, col) in self.columns.iter().enumerate() {
            let padding_direction = col.padding_direction();

            // last column does not need padding if it's left-aligned
            let padding = match &max_lengths {
                Some(_) if i == self.columns.len() - 1 && padding_direction == PaddingDirection::Left => None,
                Some(m) => Some((m.get(i).copied().unwrap_or(0), padding_direction)),
                None => None,
            };

            columns.push(ColumnStylizer {
                config: col,
                padding,
                _marker: PhantomData,
            });
        }
        columns
    }
}

impl<T, C: Column<T>> fmt::Display for Table<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self.columns.iter().map(|c| c.header().to_string()).collect();
        let mut table = vec![header];
        table.extend(
            self.data
                .iter()
                .map(|row| self.columns.iter().map(|col| col.format(row)).collect()),
        );

        let columns = self.compute_columns(&table);
        let mut rows = table.into_iter();

        if let Some(header) = rows.next() {
            let cells: Vec<_> = columns
                .iter()
                .zip(header)
                .map(|(col, cell)| col.pad(cell).bold().to_string())
                .collect();
            writeln!(f, "{}", cells.join(self.separator))?;
        }

        for (cells, row) in rows.zip(self.data) {
            let cells: Vec<_> = columns
                .iter()
                .zip(cells)
                .map(|(col, cell)| col.stylize_cell(row, cell))
                .collect();
            writeln!(f, "{}", cells.join(self.separator))?;
        }

        Ok(())
    }
}

pub trait Column<T> {
    fn header(&self) -> &'static str;
    fn format(&self, data: &T) -> String;

    fn padding_direction(&self) -> PaddingDirection {
        PaddingDirection::Left
    }

    fn get_color(&self, _data: &T) -> Option<Color> {
        None
    }
}

struct ColumnStylizer<'a, T, C: Column<T>> {
    config: &'a C,
    /// padding width and direction
    padding: Option<(usize, PaddingDirection)>,
    _marker: PhantomData<T>,
}

impl<T, C: Column<T>> ColumnStylizer<'_, T, C> {
    fn stylize_cell(&self, data: &T, cell: String) -> String {
        let cell = self.pad(cell);
        match self.config.get_color(data) {
            Some(color) => cell.color(color).to_string(),
            None => cell,
        }
    }

    fn pad(&self, cell: String) -> String {
        // pad by display width, not by chars
        match self.padding {
            Some((width, direction)) => {
                let fill = " ".repeat(width.saturating_sub(cell.width()));
                match direction {
                    PaddingDirection::Left => cell + &fill,
                    PaddingDirection::Right => fill + &cell,
                }
            }
            None => cell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingDirection {
    Left,
    Right,
}

fn get_column_max_width(table: &[Vec<String>]) -> Vec<usize> {
    let mut max_width = vec![0; table.first().map_or(0, Vec::len)];
    for row in table {
        for (width, cell) in max_width.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }
    max_width
}
