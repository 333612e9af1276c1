//! Plain-text rendering of query results.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub max_rows: usize,
    pub max_cell_width: usize,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            max_cell_width: 40,
        }
    }
}

pub const EMPTY_RESULT_TEXT: &str = "Query returned no rows.";

const NULL_TEXT: &str = "NULL";

/// Renders rows as a bordered text table followed by the row count footer.
pub fn render_table(
    columns: &[String],
    rows: &[Vec<Option<String>>],
    format: &TableFormat,
) -> String {
    if rows.is_empty() {
        return EMPTY_RESULT_TEXT.to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    // Output is shown in the GUI too, so it must not follow the terminal width.
    table.set_content_arrangement(ContentArrangement::Disabled);
    table.set_header(
        columns
            .iter()
            .map(|name| Cell::new(truncate(name, format.max_cell_width))),
    );

    let shown = &rows[..rows.len().min(format.max_rows)];
    for row in shown {
        table.add_row((0..columns.len()).map(|index| {
            let cell = row
                .get(index)
                .and_then(|cell| cell.as_deref())
                .unwrap_or(NULL_TEXT);
            Cell::new(truncate(cell, format.max_cell_width))
        }));
    }

    let mut text = table.to_string();
    let hidden = rows.len() - shown.len();
    if hidden > 0 {
        text.push_str(&format!("\n... {hidden} more {}", plural(hidden, "row")));
    }
    text.push_str(&format!("\n({} {})", rows.len(), plural(rows.len(), "row")));
    text
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    let max_width = max_width.max(1);
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_width - 1).collect();
    out.push('…');
    out
}
