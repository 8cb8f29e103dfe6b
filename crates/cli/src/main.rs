// folio CLI entry point.

use clap::Parser;

mod commands;
mod exit_code;
mod output;

use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "folio", about = "Markdown posts with frontmatter-driven file names")]
struct Cli {
    /// State directory holding config.toml and session.json (default: ~/.folio).
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<std::path::PathBuf>,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() {
    // Logs go to stderr so JSON on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.json);
    if let Err(error) = commands::run(cli.command, cli.state_dir, format) {
        output::print_anyhow_error(format, &error);
        ExitCode::from_error(&error).exit();
    }
}
