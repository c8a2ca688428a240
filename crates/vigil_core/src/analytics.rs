//! Best-effort analytics hook
//!
//! Primary calls to action emit a fire-and-forget record to an external
//! collector. Emission never blocks or fails the click handler: sink errors
//! and sink panics are both caught here and logged.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, Result};

/// Event record sent to the collector
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub event: String,
    pub lead_type: String,
}

impl AnalyticsRecord {
    /// The record emitted by the "Contact Command" call to action
    pub fn contact_click() -> Self {
        Self {
            event: "lead_generation".to_string(),
            lead_type: "contact_button_click".to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        // Two plain string fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// External collector for analytics records
pub trait AnalyticsSink {
    fn emit(&self, record: &AnalyticsRecord) -> Result<()>;
}

/// Emit a record, swallowing and logging any failure.
///
/// Returns `true` when the sink accepted the record.
pub fn emit_best_effort(sink: &dyn AnalyticsSink, record: &AnalyticsRecord) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.emit(record))) {
        Ok(Ok(())) => {
            tracing::debug!(event = %record.event, lead_type = %record.lead_type, "analytics emitted");
            true
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "analytics emission dropped");
            false
        }
        Err(_) => {
            tracing::warn!(event = %record.event, "analytics sink panicked; emission dropped");
            false
        }
    }
}

/// Sink that writes records to the log
#[derive(Debug, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn emit(&self, record: &AnalyticsRecord) -> Result<()> {
        tracing::info!(target: "vigil::analytics", payload = %record.to_json(), "analytics event");
        Ok(())
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn emit(&self, _record: &AnalyticsRecord) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps records in memory, for headless runs and tests
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<AnalyticsRecord>>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every record with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: Rc::default(),
            fail_with: Some(message.into()),
        }
    }

    pub fn records(&self) -> Vec<AnalyticsRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl AnalyticsSink for RecordingSink {
    fn emit(&self, record: &AnalyticsRecord) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(IntegrationError::AnalyticsFailed(message.clone()));
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingSink;

    impl AnalyticsSink for PanickingSink {
        fn emit(&self, _record: &AnalyticsRecord) -> Result<()> {
            panic!("collector exploded");
        }
    }

    #[test]
    fn test_contact_record_shape() {
        let record = AnalyticsRecord::contact_click();
        assert_eq!(
            record.to_json(),
            r#"{"event":"lead_generation","lead_type":"contact_button_click"}"#
        );
    }

    #[test]
    fn test_recording_sink_collects() {
        let sink = RecordingSink::new();
        assert!(emit_best_effort(&sink, &AnalyticsRecord::contact_click()));
        assert!(emit_best_effort(&sink, &AnalyticsRecord::contact_click()));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let sink = RecordingSink::failing("collector offline");
        assert!(!emit_best_effort(&sink, &AnalyticsRecord::contact_click()));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_panicking_sink_is_swallowed() {
        assert!(!emit_best_effort(&PanickingSink, &AnalyticsRecord::contact_click()));
    }
}
