use parking_lot::Mutex;
use serde::Serialize;
use specto_tracer::Value;
use specto_tracer::record::RecordSink;

/// One traced line, with the changes attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Line number the record was opened for.
    pub line: u32,

    /// Variable changes attached to this record.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableChange>,

    /// Values accessed while this record was the last one, as reported by
    /// observed functions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accesses: Vec<Value>,
}

impl Record {
    const fn new(line: u32) -> Self {
        Self {
            line,
            variables: Vec::new(),
            accesses: Vec::new(),
        }
    }
}

/// One variable change: a name and the value it was bound to.
#[derive(Debug, Clone, Serialize)]
pub struct VariableChange {
    /// Name (or watch key) of the variable.
    pub name: String,

    /// Value the variable changed to.
    pub value: Value,
}

/// Append-only, ordered record log.
///
/// A recorder is shared between the tracer (which feeds it) and whoever
/// consumes the change list afterwards; it serializes its own appends, so
/// tracers on several threads may feed the same recorder.
#[derive(Debug, Default)]
pub struct Recorder {
    changes: Mutex<Vec<Record>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the change list.
    pub fn changes(&self) -> Vec<Record> {
        self.changes.lock().clone()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    /// Returns whether no record was opened yet.
    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }

    /// Serializes the change list to a JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(&*self.changes.lock())?)
    }

    /// Writes the change list as JSON.
    pub fn write_json(&self, writer: impl std::io::Write) -> crate::Result<()> {
        Ok(serde_json::to_writer(writer, &*self.changes.lock())?)
    }

    fn with_record<T>(&self, back: usize, f: impl FnOnce(&mut Record) -> T) -> Option<T> {
        let mut changes = self.changes.lock();
        let len = changes.len();

        // Asking for the previous record when only one exists falls back to
        // that one; changes reported with no record at all are dropped.
        let index = len.checked_sub(back + 1).or_else(|| len.checked_sub(1))?;

        changes.get_mut(index).map(f)
    }
}

impl RecordSink for Recorder {
    fn add_record(&self, line: u32) {
        self.changes.lock().push(Record::new(line));
    }

    fn add_variable_change_to_last_record(&self, name: &str, value: &Value) {
        self.with_record(0, |record| {
            record.variables.push(VariableChange {
                name: name.to_owned(),
                value: value.clone(),
            });
        });
    }

    fn add_variable_change_to_previous_record(&self, name: &str, value: &Value) {
        self.with_record(1, |record| {
            record.variables.push(VariableChange {
                name: name.to_owned(),
                value: value.clone(),
            });
        });
    }

    fn add_access_to_last_record(&self, value: &Value) {
        self.with_record(0, |record| {
            record.accesses.push(value.clone());
        });
    }
}
