//! `xdm`: command-line front end for the lossless XML merge library.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tools::{LineCol, LineIndex};
use xdm::debug::outline;
use xdm::{
    Document, MergeConfig, NodeRef, ParseConfig, containing_element, containing_node, flush, merge,
    node_span, parse_with_config,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "xdm", version)]
#[command(about = "Lossless XML round-trips and positional merges")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Maximum element nesting accepted by the parser
    #[arg(long, global = true, default_value_t = ParseConfig::default().max_depth)]
    max_depth: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a file and print it back; fails if the output differs from the input
    Flush { file: PathBuf },

    /// Merge OLD toward NEW and print the merged document
    Merge {
        old: PathBuf,
        new: PathBuf,
        /// Insert complete subtrees instead of empty shells
        #[arg(long)]
        deep: bool,
        /// Print the patch plan instead of the merged text
        #[arg(long, conflicts_with = "json")]
        plan: bool,
        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },

    /// Print an indented outline of the tree
    Outline {
        file: PathBuf,
        /// Maximum number of lines
        #[arg(long, default_value_t = 200)]
        cap: usize,
    },

    /// Show the node at a position in the file
    Locate {
        file: PathBuf,
        #[command(flatten)]
        position: Position,
    },
}

#[derive(Args)]
#[group(required = true)]
struct Position {
    /// Byte offset
    #[arg(long, conflicts_with_all = ["line", "column"])]
    offset: Option<usize>,
    /// One-based line
    #[arg(long, requires = "column")]
    line: Option<usize>,
    /// One-based column
    #[arg(long, requires = "line")]
    column: Option<usize>,
}

#[derive(Serialize)]
struct MergeReport<'a> {
    mode: &'a str,
    plan: Vec<String>,
    merged: String,
    converged: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = ParseConfig {
        max_depth: cli.max_depth,
    };

    match cli.command {
        Command::Flush { file } => {
            let (source, doc) = load(&file, &config)?;
            let text = flush(&doc);
            print!("{text}");
            if text != source {
                bail!("{}: flushed text differs from the input", file.display());
            }
        }
        Command::Merge {
            old,
            new,
            deep,
            plan,
            json,
        } => {
            let (_, mut old_doc) = load(&old, &config)?;
            let (new_source, new_doc) = load(&new, &config)?;
            let merge_config = if deep {
                MergeConfig::deep()
            } else {
                MergeConfig::default()
            };
            let patches = merge(&old_doc, &new_doc, &merge_config);
            let described: Vec<String> = patches.iter().map(|p| p.describe(&old_doc)).collect();
            if plan {
                for line in &described {
                    println!("{line}");
                }
                return Ok(());
            }
            old_doc
                .apply(patches)
                .with_context(|| format!("applying the merge plan to {}", old.display()))?;
            let merged = flush(&old_doc);
            if json {
                let report = MergeReport {
                    mode: if deep { "deep" } else { "shell" },
                    plan: described,
                    converged: merged == new_source,
                    merged,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{merged}");
            }
        }
        Command::Outline { file, cap } => {
            let (_, doc) = load(&file, &config)?;
            for line in outline(&doc, cap) {
                println!("{line}");
            }
        }
        Command::Locate { file, position } => {
            let (source, doc) = load(&file, &config)?;
            let offset = resolve_offset(&source, &position)?;
            locate(&doc, &source, offset)?;
        }
    }
    Ok(())
}

fn load(path: &Path, config: &ParseConfig) -> Result<(String, Document)> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = parse_with_config(&source, config)
        .map_err(|err| anyhow!("{}:{}: {err}", path.display(), err.line_col(&source)))?;
    log::debug!("parsed {} ({} bytes)", path.display(), source.len());
    Ok((source, doc))
}

fn resolve_offset(source: &str, position: &Position) -> Result<usize> {
    if let Some(offset) = position.offset {
        return Ok(offset);
    }
    let (Some(line), Some(column)) = (position.line, position.column) else {
        bail!("either --offset or --line with --column is required");
    };
    if line == 0 || column == 0 {
        bail!("lines and columns are one-based");
    }
    LineIndex::new(source)
        .offset(LineCol {
            line: line - 1,
            column: column - 1,
        })
        .ok_or_else(|| anyhow!("{line}:{column} is outside the file"))
}

fn locate(doc: &Document, source: &str, offset: usize) -> Result<()> {
    let node = containing_node(doc, offset)
        .ok_or_else(|| anyhow!("offset {offset} is past the end of the document"))?;
    let index = LineIndex::new(source);
    print_node("node", node, doc, &index);
    if let Some(element) = containing_element(doc, offset) {
        if !node.is_same(NodeRef::Element(element)) {
            print_node("element", NodeRef::Element(element), doc, &index);
        }
    }
    Ok(())
}

fn print_node(label: &str, node: NodeRef<'_>, doc: &Document, index: &LineIndex<'_>) {
    match node_span(doc, node.id()) {
        Some(span) => println!(
            "{label}: {node} at {}..{} ({})",
            span.start,
            span.end,
            index.line_col(span.start)
        ),
        None => println!("{label}: {node}"),
    }
}
