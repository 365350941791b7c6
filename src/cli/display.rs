//! Shared display primitives: tables, labels and lock badge colors.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::style;

use crate::domain::models::{LockBadge, LockLabel};

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table to string with a count header.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {}:\n{}", style(total).bold(), noun, table)
}

/// Styled label for detail views.
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}

/// Badge text for an idea card; empty when nobody is editing.
pub fn badge_text(badge: &LockBadge) -> String {
    match badge.label {
        Some(LockLabel::Active) => style(LockLabel::Active.as_str()).yellow().bold().to_string(),
        Some(LockLabel::Editing) => style(LockLabel::Editing.as_str()).green().to_string(),
        None => String::new(),
    }
}

pub fn success(message: &str) -> String {
    format!("{} {}", style("\u{2713}").green().bold(), message)
}

pub fn failure(message: &str) -> String {
    format!("{} {}", style("\u{2717}").red().bold(), message)
}
