use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::RecordDump;

/// Renders a per-line summary: visits and variable changes, in line order.
pub(crate) fn render(records: &[RecordDump]) -> String {
    let mut summary: BTreeMap<u32, (usize, usize)> = BTreeMap::new();

    for record in records {
        let entry = summary.entry(record.line).or_default();
        entry.0 += 1;
        entry.1 += record.variables.len();
    }

    let mut out = String::new();

    for (line, (visits, changes)) in summary {
        let _ = writeln!(
            out,
            "line {line:>4}  visits {visits:>4}  variable changes {changes:>4}"
        );
    }

    out
}
