use clap::Parser;
use miette::Result;
use csvgrader::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for diagnostics
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
    csvgrader::cli::helpers::init_logging(&global);

    match cli.command {
        Commands::Preview(args) => csvgrader::cli::commands::preview::run(args, &global),
        Commands::Import(args) => csvgrader::cli::commands::import::run(args, &global),
        Commands::Last => csvgrader::cli::commands::last::run(&global),
        Commands::Targets => csvgrader::cli::commands::targets::run(&global),
        Commands::Template => csvgrader::cli::commands::template::run(),
        Commands::Config(cmd) => csvgrader::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => csvgrader::cli::commands::completions::run(args),
    }
}
