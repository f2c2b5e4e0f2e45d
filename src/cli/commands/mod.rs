//! Command implementations

pub mod cache;
pub mod completions;
pub mod fav;
pub mod init;
pub mod list;
pub mod played;
pub mod tag;
pub mod views;

use miette::Result;

use crate::catalog::Session;
use crate::cli::GlobalOpts;
use crate::core::{Config, Layout};

/// Resolve the frontend layout from --root or by discovery
pub fn resolve_layout(global: &GlobalOpts) -> Result<Layout> {
    let layout = match &global.root {
        Some(root) => Layout::discover_from(root),
        None => Layout::discover(),
    };
    layout.map_err(|e| miette::miette!("{}", e))
}

/// Open a session over the resolved layout
pub fn open_session(global: &GlobalOpts) -> Result<Session> {
    let layout = resolve_layout(global)?;
    let config = Config::load(Some(&layout));
    Ok(Session::open(layout, config))
}

/// Pick the view to operate on: the named one, or the configured default
pub fn pick_view(session: &Session, named: Option<&str>) -> Result<String> {
    match named {
        Some(name) => Ok(name.to_string()),
        None => session
            .default_view()
            .map(String::from)
            .ok_or_else(|| miette::miette!("no views configured; add one under views/")),
    }
}
