//! Spinner-based progress reporting for batch runs.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use demoforge_core::{LeadPhase, PipelineResult, ProgressReporter, RunSummary};

/// CLI progress reporter using an indicatif spinner.
pub(crate) struct CliProgress {
    spinner: ProgressBar,
    lead: Mutex<String>,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self {
            spinner,
            lead: Mutex::new(String::new()),
        }
    }

    /// Clear the spinner when no batch summary will follow.
    pub(crate) fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    fn lead_label(&self) -> String {
        self.lead.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressReporter for CliProgress {
    fn batch_started(&self, total: usize) {
        self.spinner
            .set_message(format!("Processing {total} lead(s)"));
    }

    fn lead_started(&self, url: &str, current: usize, total: usize) {
        let label = format!("[{current}/{total}] {url}");
        self.spinner.set_message(label.clone());
        if let Ok(mut lead) = self.lead.lock() {
            *lead = label;
        }
    }

    fn phase(&self, phase: LeadPhase) {
        self.spinner
            .set_message(format!("{} · {phase}", self.lead_label()));
    }

    fn lead_finished(&self, result: &PipelineResult) {
        self.spinner.println(format!("  {}", result_line(result)));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

/// One human-readable line per lead.
pub(crate) fn result_line(result: &PipelineResult) -> String {
    if result.is_success() {
        let method = result
            .deployment
            .as_ref()
            .map(|d| d.method.to_string())
            .unwrap_or_default();
        format!(
            "✓ {}  {}  ({method})",
            result.company.as_deref().unwrap_or(&result.url),
            result.demo_url.as_deref().unwrap_or("-"),
        )
    } else {
        format!(
            "✗ {}  {}",
            result.url,
            result.error.as_deref().unwrap_or("failed")
        )
    }
}
