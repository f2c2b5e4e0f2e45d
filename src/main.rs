use clap::Parser;
use miette::Result;
use romdeck::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    let directives = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("ROMDECK_LOG"))
        .unwrap_or_else(|_| "romdeck=warn".to_string());
    let filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("romdeck=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Install miette's fancy error handler
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => romdeck::cli::commands::init::run(args),
        Commands::Views(args) => romdeck::cli::commands::views::run(args, &global),
        Commands::List(args) => romdeck::cli::commands::list::run(args, &global),
        Commands::Cache(cmd) => romdeck::cli::commands::cache::run(cmd, &global),
        Commands::Fav(args) => romdeck::cli::commands::fav::run(args, &global),
        Commands::Tag(args) => romdeck::cli::commands::tag::run(args, &global),
        Commands::Played(args) => romdeck::cli::commands::played::run(args, &global),
        Commands::Completions(args) => romdeck::cli::commands::completions::run(args),
    }
}
