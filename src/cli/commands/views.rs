//! `romdeck views` - list configured views and their filters

use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::open_session;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ViewsArgs {}

pub fn run(_args: ViewsArgs, global: &GlobalOpts) -> Result<()> {
    let session = open_session(global)?;

    if session.views().is_empty() {
        println!("No views configured. Add YAML files under views/.");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["VIEW", "ROMLIST", "GROUPING", "GLOBAL RULES", "FILTERS"]);

    for view in session.views() {
        let filters = view
            .filters
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        builder.push_record([
            view.name.clone(),
            view.romlist.clone(),
            (if view.clone_grouping { "clones" } else { "flat" }).to_string(),
            view.global_rules.len().to_string(),
            filters,
        ]);
    }

    let table = builder.build().with(Style::sharp()).to_string();
    println!("{}", table);

    if !global.quiet {
        println!(
            "{} view(s) configured",
            style(session.views().len()).cyan()
        );
    }
    Ok(())
}
