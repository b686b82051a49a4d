//! Command line arguments for `shardcat`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use shardcat_core::ContentType;

/// Inspect a sharded media catalog without loading all of it.
#[derive(Parser, Debug)]
#[command(name = "shardcat", version, about)]
pub struct Cli {
    /// Configuration file. Defaults to ./shardcat.toml when present.
    #[arg(long, short = 'c', global = true, env = "SHARDCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding index.json and the shards; overrides the config.
    #[arg(long, short = 'r', global = true)]
    pub root: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List categories from the index.
    Categories {
        /// Include adult categories.
        #[arg(long)]
        adult: bool,
    },

    /// Page through one category.
    Browse(BrowseArgs),

    /// Search category names and the pages warmed for the search.
    Search(SearchArgs),

    /// Load a category's adult items.
    Adult {
        category: String,
    },
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    pub category: String,

    /// Pages to load, starting at 1.
    #[arg(long, short = 'p', default_value_t = 1)]
    pub pages: u32,

    /// Items to print.
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,

    /// Print cache statistics and metrics afterwards.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    /// Categories to load before searching. Only loaded pages are searched.
    #[arg(long = "warm", short = 'w')]
    pub warm: Vec<String>,

    #[arg(long = "type", short = 't')]
    pub content_type: Option<ContentType>,

    #[arg(long)]
    pub genre: Option<String>,

    #[arg(long)]
    pub min_rating: Option<f32>,

    /// Include adult content.
    #[arg(long)]
    pub adult: bool,
}
