pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;

/// Borderless table with a bold title row.
pub fn new_table(titles: &[&str]) -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .column_separator(' ')
        .separator(
            prettytable::format::LinePosition::Title,
            prettytable::format::LineSeparator::new('-', ' ', ' ', ' '),
        )
        .padding(1, 1)
        .build();
    table.set_format(format);

    let cells = titles
        .iter()
        .map(|title| prettytable::Cell::new(title).style_spec("b"))
        .collect();
    table.set_titles(prettytable::Row::new(cells));

    table
}

/// Whether stdout is an interactive terminal; decorations are skipped
/// when output is piped.
pub fn stdout_is_tty() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
