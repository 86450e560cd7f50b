use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kitroom::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` terminates quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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

    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Init(args) => kitroom::cli::commands::init::run(args),
        Commands::Import(cmd) => kitroom::cli::commands::import::run(cmd, &global),
        Commands::Inventory(cmd) => kitroom::cli::commands::inventory::run(cmd, &global),
        Commands::Device(cmd) => kitroom::cli::commands::device::run(cmd, &global),
        Commands::Job(cmd) => kitroom::cli::commands::job::run(cmd, &global),
        Commands::Case(cmd) => kitroom::cli::commands::case::run(cmd, &global),
        Commands::Sweep(args) => kitroom::cli::commands::sweep::run(args, &global),
        Commands::Store(cmd) => kitroom::cli::commands::store::run(cmd, &global),
        Commands::Completions(args) => kitroom::cli::commands::completions::run(args),
    }
}
