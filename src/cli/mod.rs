//! CLI command definitions and handlers

pub mod index;
pub mod release;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Element-level search indexing for structured XML documents.

Every element of every document becomes one record carrying its tree
position, inherited attributes, text and reuse qualification, next to one
summary record per document.

EXAMPLES:
    xmldex index ./docs --repo demo --rev 12
    xmldex index ./docs --repo demo --rev 13 --deleted /old/a.xml
    xmldex index ./sv --repo demo --rev 14 \
        --prop prop_abx.TranslationMaster='demo^/release/a.xml?p=12'
    xmldex release 'demo^/release/a.xml?p=12' --json
"#;

/// Element-level XML search indexing
#[derive(Parser, Debug)]
#[command(name = "xmldex")]
#[command(author, version)]
#[command(about = "Element-level XML search indexing")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index every XML file under a directory as one revision
    #[command(visible_alias = "i")]
    Index(IndexArgs),

    /// Show the RID -> checksum map of an indexed Release
    #[command(visible_alias = "r")]
    Release(ReleaseArgs),
}

/// Arguments for the index command
#[derive(Parser, Debug)]
#[command(after_help = "Paths are recorded relative to DIR with a leading '/'.
Every file found replaces what the index held for its path.")]
pub struct IndexArgs {
    /// Directory to walk
    pub dir: PathBuf,

    /// Repository name recorded on every record
    #[arg(long)]
    pub repo: String,

    /// Revision being indexed
    #[arg(long)]
    pub rev: u64,

    /// Index name (default: the repository name)
    #[arg(long)]
    pub index: Option<String>,

    /// Paths removed in this revision
    #[arg(long, num_args = 1..)]
    pub deleted: Vec<String>,

    /// Property added to every document, KEY=VALUE
    #[arg(long = "prop", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the release command
#[derive(Parser, Debug)]
pub struct ReleaseArgs {
    /// Logical id of the Release, `{repo}^{path}?p={rev}`
    pub logicalid: String,

    /// Index name (default: the repository part of the logical id)
    #[arg(long)]
    pub index: Option<String>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

fn parse_property(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", value))?;
    if key.is_empty() {
        return Err("property name is empty".to_string());
    }
    Ok((key.to_string(), val.to_string()))
}
