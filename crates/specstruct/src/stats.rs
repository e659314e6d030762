use colored::Colorize;
use specstruct_core::{LineStatistics, Precondition, StructureConfig, StructureError, TextLine};

use crate::io::{print_json, read_json};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct StatsOptions {
    /// JSON file with the document's text lines
    pub lines: std::path::PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(options: StatsOptions, config: &StructureConfig) -> Result<()> {
    let lines: Vec<TextLine> = read_json(&options.lines, Precondition::LinesMissing)?;
    if lines.is_empty() {
        return Err(StructureError::MissingPrecondition(Precondition::LinesMissing).into());
    }

    let stats = LineStatistics::compute(&lines, config);

    if options.json {
        return print_json(&stats);
    }

    let mut table = new_table(&["Page", "Median size", "Stdev", "Median indent", "TOC"]);
    for (page, page_stats) in &stats.pages {
        let toc = if stats.is_toc_page(*page) { "yes" } else { "" };
        table.add_row(prettytable::row![
            page + 1,
            f!("{:.1}", page_stats.median_font_size),
            f!("{:.2}", page_stats.stdev_font_size),
            f!("{:.1}", page_stats.median_indent),
            toc
        ]);
    }
    table.printstd();

    if !stats.running_lines.is_empty() {
        println!();
        println!("{}", "Running lines".green());
        for running in &stats.running_lines {
            println!("  y={:<5} {}", running.position, running.text);
        }
    }

    Ok(())
}
