use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"), long_about = None)]
pub struct Cli {
    /// Echo log messages to the console while running.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Skip checking GitHub for a newer release.
    #[arg(long)]
    pub skip_version_check: bool,
}
