use specstruct_core::{
    chunk_map, resolve_sections, OverlapPolicy, ParsedObject, Precondition, SectionChunk, SectionNode,
    StructureConfig,
};

use crate::io::{print_json, read_json};
use crate::prelude::*;

#[derive(Debug, clap::Args, Clone)]
pub struct ChunksOptions {
    /// JSON file with the section tree (a single root node)
    pub sections: std::path::PathBuf,

    /// JSON file with the parsed objects
    pub objects: std::path::PathBuf,

    /// How overlapping leaf spans are bounded (overrides the configuration)
    #[arg(long, env = "SPECSTRUCT_OVERLAP")]
    pub overlap: Option<Overlap>,

    /// Give objects no section claimed to the root chunk
    #[arg(long)]
    pub orphans_to_root: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Output a JSON object mapping section ids to object ids
    #[arg(long, conflicts_with = "json")]
    pub map: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum Overlap {
    /// Clamp each leaf at the next leaf anchor
    Clamp,
    /// Use span ends as given; shared objects go to the nearest anchor
    Trust,
}

impl From<Overlap> for OverlapPolicy {
    fn from(value: Overlap) -> Self {
        match value {
            Overlap::Clamp => OverlapPolicy::Clamp,
            Overlap::Trust => OverlapPolicy::Trust,
        }
    }
}

pub fn run(options: ChunksOptions, config: &StructureConfig) -> Result<()> {
    let root: SectionNode = read_json(&options.sections, Precondition::SectionsMissing)?;
    let objects: Vec<ParsedObject> = read_json(&options.objects, Precondition::ParsedObjectsMissing)?;

    let mut config = config.clone();
    if let Some(overlap) = options.overlap {
        config.overlap_policy = overlap.into();
    }
    if options.orphans_to_root {
        config.root_collects_orphans = true;
    }

    let chunks = resolve_sections(&root, &objects, &config)?;

    if options.map {
        print_json(&chunk_map(&chunks))
    } else if options.json {
        print_json(&chunks)
    } else {
        print_chunk_table(&chunks);
        Ok(())
    }
}

fn object_range(chunk: &SectionChunk) -> String {
    match (chunk.object_ids.first(), chunk.object_ids.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => f!("{} .. {}", first, last),
        _ => "-".to_string(),
    }
}

fn print_chunk_table(chunks: &[SectionChunk]) {
    let mut table = new_table(&["Section", "Path", "Depth", "Leaf", "Objects", "Range"]);
    for chunk in chunks {
        let leaf = if chunk.is_leaf { "yes" } else { "" };
        table.add_row(prettytable::row![
            chunk.section_id,
            chunk.header_path,
            chunk.depth,
            leaf,
            chunk.object_ids.len(),
            object_range(chunk)
        ]);
    }
    table.printstd();
}
