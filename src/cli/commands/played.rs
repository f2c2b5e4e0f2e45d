//! `romdeck played` - record a play session for an item

use chrono::Utc;
use console::style;
use miette::Result;

use crate::catalog::Attribute;
use crate::cli::commands::{open_session, pick_view};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct PlayedArgs {
    /// Rom name that was played
    pub name: String,

    /// Play time in seconds
    #[arg(default_value_t = 0)]
    pub seconds: u64,

    /// View to operate on (default: configured default view)
    #[arg(long)]
    pub view: Option<String>,
}

pub fn run(args: PlayedArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let view_name = pick_view(&session, args.view.as_deref())?;
    session
        .select_view(&view_name)
        .map_err(|e| miette::miette!("{}", e))?;

    let position = session
        .position_of(0, &args.name)
        .map_err(|e| miette::miette!("{}", e))?;
    session
        .record_play(0, position, args.seconds, Utc::now().timestamp())
        .map_err(|e| miette::miette!("{}", e))?;

    let record = session
        .record_at(0, position)
        .map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} {} played {} time(s), {}s total",
        style("✓").green(),
        args.name,
        record.get(Attribute::PlayedCount),
        record.get(Attribute::PlayedTime)
    );
    Ok(())
}
