//! `romdeck init` - scaffold a new frontend directory

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::core::Layout;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub fn run(args: InitArgs) -> Result<()> {
    let layout = Layout::init(&args.path).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Initialized romdeck frontend at {}",
        style("✓").green(),
        layout.root().display()
    );
    println!("  Put romlists under  {}", layout.romlists_dir().display());
    println!("  Define views under  {}", layout.views_dir().display());
    println!("  Define emulators under {}", layout.emulators_dir().display());

    Ok(())
}
