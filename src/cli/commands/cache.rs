//! `romdeck cache` - manage the on-disk view cache
//!
//! The cache lives under `.romdeck/cache/<romlist>/` with one file per
//! cached entity. It is safe to delete at any time; the next load rebuilds
//! it from the raw romlists.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use walkdir::WalkDir;

use crate::cli::commands::{open_session, resolve_layout};
use crate::cli::GlobalOpts;

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache contents
    Status,

    /// Drop a single view's cache tree
    Invalidate {
        /// View whose cache entities are dropped
        view: String,
    },

    /// Clear the cache completely
    Clear,
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CacheCommands::Status => run_status(global),
        CacheCommands::Invalidate { view } => run_invalidate(&view, global),
        CacheCommands::Clear => run_clear(global),
    }
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let layout = resolve_layout(global)?;
    let cache_root = layout.cache_dir();

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Location: {}", cache_root.display());

    let mut files = 0usize;
    let mut bytes = 0u64;
    for entry in WalkDir::new(&cache_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        files += 1;
        bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        if global.verbose {
            println!(
                "    {}",
                entry
                    .path()
                    .strip_prefix(&cache_root)
                    .unwrap_or(entry.path())
                    .display()
            );
        }
    }

    println!("  Entries:  {}", style(files).cyan());
    println!("  Size:     {} KB", style(bytes / 1024).cyan());
    Ok(())
}

fn run_invalidate(view: &str, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    session
        .invalidate_view(view)
        .map_err(|e| miette::miette!("{}", e))?;
    println!("{} Cache invalidated for view '{}'", style("✓").green(), view);
    Ok(())
}

fn run_clear(global: &GlobalOpts) -> Result<()> {
    let layout = resolve_layout(global)?;
    let cache_root = layout.cache_dir();

    if cache_root.exists() {
        std::fs::remove_dir_all(&cache_root).into_diagnostic()?;
        std::fs::create_dir_all(&cache_root).into_diagnostic()?;
        println!("{} Cache cleared", style("✓").green());
    } else {
        println!("No cache to clear");
    }
    Ok(())
}
