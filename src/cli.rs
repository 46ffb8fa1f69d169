use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tankobon")]
#[command(version)]
#[command(about = "Read comic and manga archives page by page", long_about = None)]
#[command(after_help = "Examples:\n  \
  tankobon info 'Akira v01.cbz'            show page count and page order\n  \
  tankobon page 'Akira v01.cbz' 0 -o 0.jpg  write the first page to a file\n  \
  tankobon scan ~/Comics                   list every book under a folder")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a book's type, title, page count and page order
    Info {
        #[arg(value_name = "BOOK")]
        path: PathBuf,
    },
    /// Write the raw bytes of one page
    Page {
        #[arg(value_name = "BOOK")]
        path: PathBuf,
        /// Zero-based page index
        index: usize,
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Write the cover thumbnail produced on import
    Thumbnail {
        #[arg(value_name = "BOOK")]
        path: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// List every book below a folder
    Scan {
        #[arg(value_name = "FOLDER")]
        root: PathBuf,
    },
    /// Page through a book, reporting cache hits and load times
    Read {
        #[arg(value_name = "BOOK")]
        path: PathBuf,
        /// Page to start from
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Number of pages to turn
        #[arg(long, default_value_t = 10)]
        pages: usize,
        /// Pause between page turns, in milliseconds
        #[arg(long, default_value_t = 50)]
        delay: u64,
    },
}

impl Cli {
    /// Default log filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn,tankobon=info",
            1 => "info,tankobon=debug,tankobon_archive=debug,tankobon_cache=debug,tankobon_library=debug",
            _ => "debug,tankobon=trace,tankobon_archive=trace,tankobon_cache=trace,tankobon_library=trace",
        }
    }
}
