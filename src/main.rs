use anyhow::Result;
use clap::Parser;

use vspath::commands::nav::{cmd_nav, CommonOpts, NavCommand};

#[derive(Parser, Debug)]
#[command(name = "vspath", version, about = "Route finding over Vintage Story translocator networks")]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: NavCommand,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cmd_nav(cli.common, cli.command)
}
