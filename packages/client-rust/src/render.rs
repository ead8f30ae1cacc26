//! Plain-text table rendering for terminal front ends.

use std::fmt::Write;

use crate::controller::{Row, ViewSnapshot};
use crate::notify::{Notification, NotificationKind};

/// Renders items as an aligned table using the given column order.
///
/// Missing fields render as empty cells; every cell is cut to `max_cell`
/// characters.
#[must_use]
pub fn table<T: Row>(columns: &[String], items: &[T], max_cell: usize) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            let row = item.row();
            columns
                .iter()
                .map(|c| row.get(c).map(|v| v.to_cell(max_cell)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, columns.iter().map(String::as_str), &widths);
    push_line(
        &mut out,
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().iter().map(String::as_str),
        &widths,
    );
    for row in &rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// `page 2 of 5 (48 total)`, plus the active sort if any.
#[must_use]
pub fn pager<T>(view: &ViewSnapshot<T>) -> String {
    let mut line = format!(
        "page {} of {} ({} total)",
        view.query.page, view.total_pages, view.result.total
    );
    if let Some(sort) = &view.query.sort {
        let _ = write!(line, ", sorted by {} {}", sort.field, sort.direction.as_str());
    }
    line
}

/// One line per notification, prefixed by its kind.
#[must_use]
pub fn notification(note: &Notification) -> String {
    let tag = match note.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
    };
    format!("[{tag}] {}", note.message)
}
