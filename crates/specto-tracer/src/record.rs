use crate::runtime::Value;

/// Trait for implementing a structured record stream.
///
/// The tracer opens one record per traced line and attaches the variable
/// changes it discovers to either the record it just opened (fresh bindings
/// observed at call time) or the record opened before it (changes discovered
/// once the next line is reached).
pub trait RecordSink: Send + Sync {
    /// Opens a new record for the given line.
    fn add_record(&self, line: u32) {
        let _ = line;
    }

    /// Attaches a variable change to the most recently opened record.
    fn add_variable_change_to_last_record(&self, name: &str, value: &Value) {
        let _ = (name, value);
    }

    /// Attaches a variable change to the record opened before the most
    /// recent one.
    fn add_variable_change_to_previous_record(&self, name: &str, value: &Value) {
        let _ = (name, value);
    }

    /// Attaches an accessed value to the most recently opened record.
    ///
    /// Fed by observed functions, not by the tracer itself.
    fn add_access_to_last_record(&self, value: &Value) {
        let _ = value;
    }
}

/// Record stream that drops everything.
///
/// Used when a tracer is built without a recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecordSink;

impl RecordSink for NullRecordSink {}
