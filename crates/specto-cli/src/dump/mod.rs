mod lines;
mod records;

use std::io::{Read, Write};

use miette::IntoDiagnostic;
use serde::Deserialize;

use super::cli::CliDumpAction;

/// Runs the subcommand for dumping recorded trace information.
pub fn evaluate_dump(
    input: impl Read,
    mut output: impl Write,
    dump_action: CliDumpAction,
) -> miette::Result<()> {
    let records: Vec<RecordDump> = serde_json::from_reader(input).into_diagnostic()?;

    let rendered = match dump_action {
        CliDumpAction::Records => self::records::render(&records),
        CliDumpAction::Lines => self::lines::render(&records),
    };

    output.write_all(rendered.as_bytes()).into_diagnostic()?;

    Ok(())
}

/// One record of a trace file, as exported by a recorder.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordDump {
    /// Line number the record was opened for.
    pub line: u32,

    /// Variable changes attached to the record.
    #[serde(default)]
    pub variables: Vec<VariableDump>,

    /// Accessed values attached to the record.
    #[serde(default)]
    pub accesses: Vec<serde_json::Value>,
}

/// One variable change of a record.
#[derive(Debug, Deserialize)]
pub(crate) struct VariableDump {
    /// Name (or watch key) of the variable.
    pub name: String,

    /// Value the variable changed to.
    pub value: serde_json::Value,
}
