//! `romdeck list` - build a view and list its records

use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::catalog::Attribute;
use crate::cli::commands::{open_session, pick_view};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// View to build (default: configured default view)
    pub view: Option<String>,

    /// Sub-filter name or ordinal (default: the first filter)
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Show clone-group sizes
    #[arg(long)]
    pub groups: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = open_session(global)?;
    let view_name = pick_view(&session, args.view.as_deref())?;
    session
        .select_view(&view_name)
        .map_err(|e| miette::miette!("{}", e))?;

    let view = session.current_view().map_err(|e| miette::miette!("{}", e))?;
    let ordinal = match &args.filter {
        None => 0,
        Some(token) => match token.parse::<usize>() {
            Ok(n) => n,
            Err(_) => view
                .filters
                .iter()
                .position(|f| f.name.eq_ignore_ascii_case(token))
                .ok_or_else(|| miette::miette!("no filter named '{}'", token))?,
        },
    };

    let size = session
        .filter_size(ordinal)
        .map_err(|e| miette::miette!("{}", e))?;
    let matched = session
        .filter_matched(ordinal)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut builder = Builder::default();
    if args.groups {
        builder.push_record(["NAME", "TITLE", "YEAR", "CATEGORY", "FAV", "CLONES"]);
    } else {
        builder.push_record(["NAME", "TITLE", "YEAR", "CATEGORY", "FAV"]);
    }

    for position in 0..size {
        let group_len = if args.groups {
            session
                .clone_group(ordinal, position)
                .map(|g| g.len())
                .unwrap_or(1)
        } else {
            1
        };
        let record = session
            .record_at(ordinal, position)
            .map_err(|e| miette::miette!("{}", e))?;

        let mut row = vec![
            record.name().to_string(),
            record.display_title().to_string(),
            record.get(Attribute::Year).to_string(),
            record.get(Attribute::Category).to_string(),
            (if record.is_favourite() { "★" } else { "" }).to_string(),
        ];
        if args.groups {
            row.push(group_len.to_string());
        }
        builder.push_record(row);
    }

    let table = builder.build().with(Style::sharp()).to_string();
    println!("{}", table);

    if !global.quiet {
        println!(
            "{} of {} record(s) in {} / {}",
            style(size).cyan(),
            matched,
            view_name,
            view.filters
                .get(ordinal)
                .map(|f| f.name.as_str())
                .unwrap_or("?")
        );
    }
    Ok(())
}
