//! A [`ReportSink`] that keeps window reports for later assertions.

use std::sync::Mutex;

use kvbench::report::ReportSink;
use kvbench::window::WindowReport;

/// Collects reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<(usize, WindowReport)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all reports collected so far, in emission order.
    pub fn take(&self) -> Vec<(usize, WindowReport)> {
        std::mem::take(&mut *self.reports.lock().unwrap())
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, client: usize, report: &WindowReport) {
        self.reports.lock().unwrap().push((client, *report));
    }
}
