//! `romdeck fav` - toggle a record's favourite flag

use console::style;
use miette::Result;

use crate::catalog::Attribute;
use crate::cli::commands::{open_session, pick_view};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct FavArgs {
    /// Rom name to mark
    pub name: String,

    /// View to operate on (default: configured default view)
    #[arg(long)]
    pub view: Option<String>,

    /// Remove the favourite flag instead of setting it
    #[arg(long)]
    pub remove: bool,
}

pub fn run(args: FavArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let view_name = pick_view(&session, args.view.as_deref())?;
    session
        .select_view(&view_name)
        .map_err(|e| miette::miette!("{}", e))?;

    let position = session
        .position_of(0, &args.name)
        .map_err(|e| miette::miette!("{}", e))?;
    let value = if args.remove { "0" } else { "1" };
    let changed = session
        .set_attribute(0, position, Attribute::Favourite, value)
        .map_err(|e| miette::miette!("{}", e))?;

    if changed {
        let verb = if args.remove { "removed from" } else { "added to" };
        println!(
            "{} {} {} favourites in '{}'",
            style("✓").green(),
            args.name,
            verb,
            view_name
        );
    } else {
        println!("{} already up to date", args.name);
    }
    Ok(())
}
