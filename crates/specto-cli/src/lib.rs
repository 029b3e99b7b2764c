//! Crate implementing the CLI commands.

mod cli;
mod dump;

pub use self::cli::{CliAction, CliDumpAction, CliOpts};
pub use self::dump::evaluate_dump;
