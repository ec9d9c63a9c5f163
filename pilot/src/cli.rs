//! Command-line argument structure (spec.md §1 Non-goals excludes CLI
//! feature work; this is the minimal entrypoint surface needed to run the
//! core).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "pilot", bin_name = "pilot")]
pub struct CliArgs {
    /// Job descriptor JSON files to seed into the data-in queue at startup.
    #[arg(long = "job-file", value_name = "PATH")]
    pub job_files: Vec<PathBuf>,

    /// Base URL/directory passed to the selected communicator plugin.
    #[arg(long, default_value = "http://localhost:25443")]
    pub communicator_endpoint: String,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
