use colored::Colorize;

use crate::cli::output;

/// Declarative description of a table column.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub header: String,
    pub align_right: bool,
}

impl TableColumn {
    pub fn left(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align_right: false,
        }
    }

    /// Right-aligned, for amounts.
    pub fn right(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align_right: true,
        }
    }
}

/// Simple table model used for rendering read-only overviews.
#[derive(Debug, Clone)]
pub struct Table {
    pub title: Option<String>,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: Option<&str>, columns: Vec<TableColumn>) -> Self {
        Self {
            title: title.map(str::to_string),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row<S: Into<String>>(&mut self, cells: Vec<S>) {
        self.rows
            .push(cells.into_iter().map(|value| value.into()).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Lines without color, as printed.
    pub fn lines(&self) -> Vec<String> {
        let widths = self.widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(
            self.columns.iter().map(|column| column.header.as_str()),
            &self.columns,
            &widths,
        ));
        let total: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 2;
        lines.push("-".repeat(total));
        for row in &self.rows {
            lines.push(format_row(
                row.iter().map(String::as_str),
                &self.columns,
                &widths,
            ));
        }
        lines
    }

    pub fn render(&self) {
        if let Some(title) = &self.title {
            output::section(title);
        }
        let color = output::preferences().color_enabled;
        for (idx, line) in self.lines().into_iter().enumerate() {
            if idx == 0 && color {
                println!("{}", line.bold());
            } else {
                println!("{}", line);
            }
        }
    }
}

fn format_row<'a>(
    cells: impl Iterator<Item = &'a str>,
    columns: &[TableColumn],
    widths: &[usize],
) -> String {
    cells
        .zip(columns.iter().zip(widths))
        .map(|(cell, (column, width))| pad(cell, *width, column.align_right))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn pad(cell: &str, width: usize, align_right: bool) -> String {
    let len = cell.chars().count();
    let fill = " ".repeat(width.saturating_sub(len));
    if align_right {
        format!("{fill}{cell}")
    } else {
        format!("{cell}{fill}")
    }
}
