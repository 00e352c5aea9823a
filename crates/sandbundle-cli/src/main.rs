#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sandbundle")]
#[command(author, version, about = "Bundle a directory of sources, pulling packages from a CDN", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Bundle a directory into a single script
    Bundle {
        /// Directory whose files form the virtual file table
        dir: PathBuf,

        /// Entry point key, relative to DIR (repeatable)
        #[arg(long = "entry", short = 'e', required = true)]
        entries: Vec<String>,

        /// CDN root for bare package specifiers (default: $SANDBUNDLE_CDN_ROOT or https://esm.sh/)
        #[arg(long, value_name = "URL")]
        cdn: Option<String>,

        /// Replace an identifier at build time (e.g. __DEV__=false)
        #[arg(long, value_name = "KEY=VALUE")]
        define: Vec<String>,

        /// Never let local files shadow bare package specifiers
        #[arg(long)]
        cdn_only: bool,

        /// Output file (if not specified, prints to stdout)
        #[arg(long, short = 'o')]
        outfile: Option<PathBuf>,
    },

    /// Show where a single specifier resolves to
    Resolve {
        /// Directory whose files form the virtual file table
        dir: PathBuf,

        /// The specifier to resolve
        specifier: String,

        /// Importing file key, relative to DIR
        #[arg(long, value_name = "KEY")]
        from: Option<String>,

        /// CDN root for bare package specifiers
        #[arg(long, value_name = "URL")]
        cdn: Option<String>,

        /// Never let local files shadow bare package specifiers
        #[arg(long)]
        cdn_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Bundle {
            dir,
            entries,
            cdn,
            define,
            cdn_only,
            outfile,
        }) => {
            let action = commands::bundle::BundleAction {
                dir,
                entries,
                cdn,
                define,
                cdn_only,
                outfile,
            };
            commands::bundle::run(action, cli.json)
        }
        Some(Commands::Resolve {
            dir,
            specifier,
            from,
            cdn,
            cdn_only,
        }) => {
            let action = commands::resolve::ResolveAction {
                dir,
                specifier,
                from,
                cdn,
                cdn_only,
            };
            commands::resolve::run(action, cli.json)
        }
    }
}
