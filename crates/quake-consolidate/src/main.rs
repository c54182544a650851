use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser};
use commands::{consolidate_gamedir, ConsolidateGamedirArgs};
use miette::Result;
use utils::Verbosity;

mod commands;
mod errors;
mod utils;

/// Merge a Quake gamedir's pak archives and loose files into a single pak.
///
/// Archives are applied in ascending file name order, loose files last; the
/// last source to provide a path wins. The result is written to
/// `<GAMEDIR>_consolidated/pak0.pak`.
#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    /// The gamedir to consolidate (e.g. quake/id1)
    gamedir: Utf8PathBuf,

    /// Print nothing but errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every entry as it is processed
    #[arg(short, long)]
    verbose: bool,

    /// Path to a config file (defaults to config.toml next to the executable)
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// File name of the consolidated archive
    #[arg(long)]
    output_name: Option<String>,
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn main() -> Result<()> {
    let args = parse_args();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    utils::logging::init_logging(verbosity);

    consolidate_gamedir(ConsolidateGamedirArgs {
        gamedir: args.gamedir,
        config_path: args.config,
        output_name: args.output_name,
        verbosity,
    })
}
