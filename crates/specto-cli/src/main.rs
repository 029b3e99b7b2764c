#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use std::fs::File;
use std::path::PathBuf;

use miette::IntoDiagnostic;

use specto_cli::{CliAction, CliDumpAction, CliOpts};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("SPECTO_LOG")
                .from_env_lossy(),
        )
        .init();

    let res = match cli.action {
        CliAction::Dump {
            input,
            output,
            dump_action,
        } => evaluate_dump(input, output, dump_action),
    };

    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

fn evaluate_dump(
    input: PathBuf,
    output: Option<PathBuf>,
    dump_action: CliDumpAction,
) -> miette::Result<()> {
    let records = File::open(input).into_diagnostic()?;

    if let Some(output) = output {
        let file = File::create(output).into_diagnostic()?;
        specto_cli::evaluate_dump(records, file, dump_action)
    } else {
        specto_cli::evaluate_dump(records, std::io::stdout(), dump_action)
    }
}
