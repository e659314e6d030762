use std::collections::HashMap;

use colored::Colorize;
use specstruct_core::{
    recover_structure, ParsedObject, Precondition, SectionChunk, SectionNode, StructureConfig, TextLine,
};

use crate::io::{print_json, read_json};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct OutlineOptions {
    /// JSON file with the document's text lines
    pub lines: std::path::PathBuf,

    /// JSON file with the parsed objects
    pub objects: std::path::PathBuf,

    /// Title of the synthetic root section
    #[arg(long, default_value = "Document")]
    pub title: String,

    /// Output as JSON (headers, anchored section tree and chunks)
    #[arg(long)]
    pub json: bool,
}

pub fn run(options: OutlineOptions, config: &StructureConfig) -> Result<()> {
    let lines: Vec<TextLine> = read_json(&options.lines, Precondition::LinesMissing)?;
    let objects: Vec<ParsedObject> = read_json(&options.objects, Precondition::ParsedObjectsMissing)?;

    let recovery = recover_structure(&lines, &objects, &options.title, config)?;

    if options.json {
        return print_json(&recovery);
    }

    let content = format_outline(&recovery.sections, &recovery.chunks);
    if stdout_is_tty() {
        eprintln!(
            "{}: {}  {}: {}",
            "Sections".green(),
            (recovery.sections.node_count() - 1).to_string().bright_yellow().bold(),
            "Objects".green(),
            objects.len().to_string().bright_yellow().bold()
        );
        eprintln!();
    }
    println!("{}", content);
    Ok(())
}

fn outline_lines(node: &SectionNode, counts: &HashMap<&str, usize>, out: &mut Vec<String>) {
    let count = counts.get(node.section_id.as_str()).copied().unwrap_or(0);
    out.push(f!(
        "{}{}  [{} objects] ({})",
        "  ".repeat(node.depth),
        node.label(),
        count,
        node.section_id
    ));
    for child in &node.children {
        outline_lines(child, counts, out);
    }
}

/// Indented section tree with the number of objects each section holds.
fn format_outline(root: &SectionNode, chunks: &[SectionChunk]) -> String {
    let counts: HashMap<&str, usize> = chunks
        .iter()
        .map(|c| (c.section_id.as_str(), c.object_ids.len()))
        .collect();
    let mut out = Vec::new();
    outline_lines(root, &counts, &mut out);
    out.join("\n")
}
