//! `romdeck tag` - add or remove a record tag

use console::style;
use miette::Result;

use crate::catalog::Attribute;
use crate::cli::commands::{open_session, pick_view};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct TagArgs {
    /// Rom name to tag
    pub name: String,

    /// Tag to add or remove
    pub tag: String,

    /// View to operate on (default: configured default view)
    #[arg(long)]
    pub view: Option<String>,

    /// Remove the tag instead of adding it
    #[arg(long)]
    pub remove: bool,
}

pub fn run(args: TagArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let view_name = pick_view(&session, args.view.as_deref())?;
    session
        .select_view(&view_name)
        .map_err(|e| miette::miette!("{}", e))?;

    let position = session
        .position_of(0, &args.name)
        .map_err(|e| miette::miette!("{}", e))?;

    // Compose the new tag string from the record's current tags
    let tags: Vec<String> = {
        let record = session
            .record_at(0, position)
            .map_err(|e| miette::miette!("{}", e))?;
        let mut tags: Vec<String> = record.tags().map(String::from).collect();
        if args.remove {
            tags.retain(|t| *t != args.tag);
        } else if !tags.contains(&args.tag) {
            tags.push(args.tag.clone());
        }
        tags
    };

    let changed = session
        .set_attribute(0, position, Attribute::Tags, &tags.join(";"))
        .map_err(|e| miette::miette!("{}", e))?;

    if changed {
        let verb = if args.remove { "untagged" } else { "tagged" };
        println!(
            "{} {} {} '{}' in '{}'",
            style("✓").green(),
            args.name,
            verb,
            args.tag,
            view_name
        );
    } else {
        println!("{} already up to date", args.name);
    }
    Ok(())
}
