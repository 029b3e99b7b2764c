use std::fmt::Write as _;

use super::RecordDump;

/// Renders the records in order, one block per record.
pub(crate) fn render(records: &[RecordDump]) -> String {
    let mut out = String::new();

    for (index, record) in records.iter().enumerate() {
        let _ = writeln!(out, "#{index} line {}", record.line);

        for variable in &record.variables {
            let _ = writeln!(out, "    var {} = {}", variable.name, variable.value);
        }

        for access in &record.accesses {
            let _ = writeln!(out, "    access {access}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::dump::RecordDump;

    #[test]
    fn renders_records_with_changes() {
        let records: Vec<RecordDump> = serde_json::from_str(
            r#"[
                {"line": 1, "variables": [{"name": "x", "value": 3}]},
                {"line": 2, "accesses": ["seen"]},
                {"line": 2}
            ]"#,
        )
        .expect("parse");

        assert_eq!(
            render(&records),
            indoc::indoc! {r#"
                #0 line 1
                    var x = 3
                #1 line 2
                    access "seen"
                #2 line 2
            "#}
        );
    }
}
