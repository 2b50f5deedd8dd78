//! Plain-text reports over the commit log.

use crate::archive::LogEntry;
use crate::clock::format_timestamp;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A table cell; numbers are right aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cell {
    Text(String),
    Number(usize),
    Empty,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// Aligns rows into columns separated by two spaces.
fn render_table(rows: &[Vec<Cell>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    let mut numeric = vec![true; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.render().len());
            if matches!(cell, Cell::Text(_)) {
                numeric[i] = false;
            }
        }
    }

    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = (0..columns)
                .map(|i| {
                    let text = row.get(i).map(Cell::render).unwrap_or_default();
                    if numeric[i] {
                        format!("{text:>width$}", width = widths[i])
                    } else {
                        format!("{text:<width$}", width = widths[i])
                    }
                })
                .collect();
            cells.join("  ").trim_end().to_string()
        })
        .collect();
    lines.join("\n")
}

/// One row per revision, plus a row with the comment when it is not the
/// default one.
pub fn format_log_data(entries: &[LogEntry]) -> String {
    let mut rows = Vec::new();
    for (n, entry) in entries.iter().enumerate() {
        rows.push(vec![
            Cell::Number(n),
            Cell::text(format_timestamp(entry.timestamp, TIME_FORMAT)),
            Cell::text(format!("by {}", entry.user)),
            Cell::text(format!("via {}", entry.via)),
        ]);
        if !entry.has_default_comment() {
            rows.push(vec![Cell::Empty, Cell::text(entry.comment.clone())]);
        }
    }
    render_table(&rows)
}

/// Compact form used by completion help for `rollback`.
pub fn format_log_data_brief(entries: &[LogEntry]) -> String {
    let rows: Vec<Vec<Cell>> = entries
        .iter()
        .enumerate()
        .map(|(n, entry)| {
            vec![
                Cell::text("\t"),
                Cell::Number(n),
                Cell::text(format_timestamp(entry.timestamp, TIME_FORMAT)),
                Cell::text(entry.user.clone()),
                Cell::text(format!("by {}", entry.via)),
            ]
        })
        .collect();
    render_table(&rows)
}
