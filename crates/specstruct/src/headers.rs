use colored::Colorize;
use serde::Serialize;
use specstruct_core::{detect_headers, HeaderDetection, HeaderNode, Precondition, StructureConfig, TextLine};

use crate::io::{print_json, read_json};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct HeadersOptions {
    /// JSON file with the document's text lines
    pub lines: std::path::PathBuf,

    /// Output format: indented, markdown, json or table (default: indented)
    #[arg(long, env = "SPECSTRUCT_OUTPUT", default_value = "indented")]
    pub output: OutputFormat,

    /// Output as JSON (alias for --output json)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text format (2 spaces per level)
    Indented,
    /// Markdown nested list format
    Markdown,
    /// JSON format with structured data
    Json,
    /// One row per heading
    Table,
}

pub fn run(options: HeadersOptions, config: &StructureConfig) -> Result<()> {
    let lines: Vec<TextLine> = read_json(&options.lines, Precondition::LinesMissing)?;
    let detection = detect_headers(&lines, config)?;

    // --json takes precedence
    let format = if options.json {
        OutputFormat::Json
    } else {
        options.output
    };

    match format {
        OutputFormat::Json => print_json(&detection),
        OutputFormat::Table => {
            print_table(&detection.tree);
            Ok(())
        }
        OutputFormat::Indented | OutputFormat::Markdown => {
            output_formatted(&detection, format);
            Ok(())
        }
    }
}

fn heading_label(node: &HeaderNode) -> String {
    match &node.number {
        Some(number) => f!("{} {}", number, node.title),
        None => node.title.clone(),
    }
}

fn walk<'a>(nodes: &'a [HeaderNode], depth: usize, out: &mut Vec<(usize, &'a HeaderNode)>) {
    for node in nodes {
        out.push((depth, node));
        walk(&node.children, depth + 1, out);
    }
}

/// Pre-order `(depth, node)` pairs, depth 0 for top-level headings.
fn preorder(nodes: &[HeaderNode]) -> Vec<(usize, &HeaderNode)> {
    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}

/// Format the heading tree as indented text (2 spaces per level)
fn format_indented(nodes: &[HeaderNode]) -> String {
    preorder(nodes)
        .into_iter()
        .map(|(depth, node)| f!("{}{}  [p. {}]", "  ".repeat(depth), heading_label(node), node.page + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the heading tree as a markdown nested list
fn format_markdown(nodes: &[HeaderNode]) -> String {
    preorder(nodes)
        .into_iter()
        .map(|(depth, node)| f!("{}* {} (p. {})", "  ".repeat(depth), heading_label(node), node.page + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_table(nodes: &[HeaderNode]) {
    let mut table = new_table(&["Number", "Title", "Level", "Page", "Line", "Score"]);
    for (_, node) in preorder(nodes) {
        table.add_row(prettytable::row![
            node.number.as_deref().unwrap_or(""),
            node.title,
            node.level.as_u8(),
            node.page + 1,
            node.line_index,
            f!("{:.3}", node.score)
        ]);
    }
    table.printstd();
}

fn output_formatted(detection: &HeaderDetection, format: OutputFormat) {
    let content = match format {
        OutputFormat::Markdown => format_markdown(&detection.tree),
        _ => format_indented(&detection.tree),
    };

    if stdout_is_tty() {
        // Terminal output: summary to stderr, content to stdout
        eprintln!(
            "{}: {}",
            "Total Headings".green(),
            detection.headers.len().to_string().bright_yellow().bold()
        );
        if !detection.statistics.toc_pages.is_empty() {
            let pages: Vec<String> = detection
                .statistics
                .toc_pages
                .iter()
                .map(|p| (p + 1).to_string())
                .collect();
            eprintln!("{}: {}", "TOC Pages".green(), pages.join(", ").bright_yellow());
        }
        eprintln!();
        for line in content.lines() {
            println!("{}", line.white());
        }
    } else if !content.is_empty() {
        println!("{}", content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specstruct_core::HeadingLevel;

    fn node(title: &str, number: Option<&str>, level: u8, page: usize, children: Vec<HeaderNode>) -> HeaderNode {
        HeaderNode {
            id: title.to_lowercase(),
            title: title.to_string(),
            level: HeadingLevel::clamped(level as usize),
            page,
            line_index: 0,
            number: number.map(str::to_string),
            score: 0.9,
            children,
        }
    }

    fn sample_tree() -> Vec<HeaderNode> {
        vec![
            node(
                "Introduction",
                Some("1"),
                1,
                0,
                vec![node("Background", Some("1.1"), 2, 1, vec![])],
            ),
            node("Annexes", None, 1, 4, vec![]),
        ]
    }

    #[test]
    fn test_format_indented() {
        let expected = "1 Introduction  [p. 1]\n  1.1 Background  [p. 2]\nAnnexes  [p. 5]";
        assert_eq!(format_indented(&sample_tree()), expected);
    }

    #[test]
    fn test_format_markdown() {
        let expected = "* 1 Introduction (p. 1)\n  * 1.1 Background (p. 2)\n* Annexes (p. 5)";
        assert_eq!(format_markdown(&sample_tree()), expected);
    }

    #[test]
    fn test_format_empty_tree() {
        assert_eq!(format_indented(&[]), "");
        assert_eq!(format_markdown(&[]), "");
    }

    #[test]
    fn test_preorder_depths() {
        let tree = sample_tree();
        let depths: Vec<usize> = preorder(&tree).into_iter().map(|(d, _)| d).collect();
        assert_eq!(depths, vec![0, 1, 0]);
    }
}
