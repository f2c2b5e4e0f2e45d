//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    cache::CacheCommands, completions::CompletionsArgs, fav::FavArgs, init::InitArgs,
    list::ListArgs, played::PlayedArgs, tag::TagArgs, views::ViewsArgs,
};

#[derive(Parser)]
#[command(name = "romdeck")]
#[command(author, version, about = "Romdeck catalog engine")]
#[command(
    long_about = "Catalog, filter and cache engine for a game launcher: loads romlists, builds filtered views, and keeps them cached on disk."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Frontend root (default: auto-detect by finding .romdeck/)
    #[arg(long, global = true, env = "ROMDECK_ROOT")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new romdeck frontend directory
    Init(InitArgs),

    /// List configured views and their filters
    Views(ViewsArgs),

    /// Build a view and list its records
    List(ListArgs),

    /// Manage the on-disk view cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Toggle a record's favourite flag
    Fav(FavArgs),

    /// Add or remove a record tag
    Tag(TagArgs),

    /// Record a play session for an item
    Played(PlayedArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
