use std::path::PathBuf;

/// The Specto trace inspector.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Command to dump information from a recorded trace file.
    Dump {
        /// Path to the recorded trace file (JSON export of a recorder).
        #[clap(short, long, value_name = "PATH")]
        input: PathBuf,

        /// Path to the optional destination of the dump.
        #[clap(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// The type of dump to perform.
        #[clap(subcommand)]
        dump_action: CliDumpAction,
    },
}

/// The dump command to run.
#[derive(clap::Subcommand)]
pub enum CliDumpAction {
    /// Dump the records in order, with their variable changes and accesses.
    Records,

    /// Dump a per-line summary of visits and variable changes.
    Lines,
}

impl CliOpts {
    /// Parses the command line.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}
