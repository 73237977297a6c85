//! Import report built from one submission attempt

use serde::Serialize;
use std::fmt;

use crate::core::coordinator::{ImportError, SubmitState};
use crate::core::request::{Action, ImportOutcome, ImportResponse};

/// Message used when the endpoint rejects an import without saying why
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Aggregate outcome of one submission
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub success: bool,

    /// Server summary on success, error message on failure
    pub summary: String,

    pub results: Vec<ImportOutcome>,

    /// Row-level errors from an otherwise successful import
    pub errors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,

    #[serde(skip)]
    pub failure: Option<ImportError>,
}

impl ImportReport {
    /// Interpret a well-formed response body
    pub fn from_response(response: ImportResponse) -> Self {
        if !response.success {
            let message = response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            return Self::failed(ImportError::RemoteRejection { message });
        }

        let mut report = Self {
            success: true,
            summary: String::new(),
            results: response.results.unwrap_or_default(),
            errors: response.errors.unwrap_or_default(),
            created: response.created,
            updated: response.updated,
            failure: None,
        };
        report.summary = match response.summary {
            Some(summary) => summary,
            None => report.fallback_summary(),
        };
        report
    }

    /// A report for a submission that failed as a whole
    pub fn failed(error: ImportError) -> Self {
        Self {
            success: false,
            summary: error.to_string(),
            results: Vec::new(),
            errors: Vec::new(),
            created: None,
            updated: None,
            failure: Some(error),
        }
    }

    /// Rows created, as reported by the server or counted from `results`
    pub fn created_count(&self) -> u64 {
        self.created.unwrap_or_else(|| self.count(Action::Created))
    }

    pub fn updated_count(&self) -> u64 {
        self.updated.unwrap_or_else(|| self.count(Action::Updated))
    }

    fn count(&self, action: Action) -> u64 {
        self.results.iter().filter(|r| r.action == action).count() as u64
    }

    fn fallback_summary(&self) -> String {
        let mut summary = format!(
            "{} created, {} updated",
            self.created_count(),
            self.updated_count()
        );
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {} errors", self.errors.len()));
        }
        summary
    }

    /// Terminal state of the submission that produced this report
    pub fn terminal_state(&self) -> SubmitState {
        match &self.failure {
            None => SubmitState::Succeeded,
            Some(ImportError::Transport(_)) => SubmitState::TransportFailed,
            Some(_) => SubmitState::RejectedRemote,
        }
    }

    /// Human-readable lines, in display order
    pub fn lines(&self) -> Vec<ReportLine<'_>> {
        if !self.success {
            return vec![ReportLine::Failure(&self.summary)];
        }

        let mut lines = Vec::with_capacity(self.results.len() + self.errors.len() + 2);
        lines.push(ReportLine::Summary(&self.summary));
        lines.extend(self.results.iter().map(ReportLine::Outcome));
        if !self.errors.is_empty() {
            lines.push(ReportLine::ErrorsHeader);
            lines.extend(self.errors.iter().map(|e| ReportLine::RowError(e)));
        }
        lines
    }
}

/// One display line of a report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportLine<'a> {
    Summary(&'a str),
    Outcome(&'a ImportOutcome),
    ErrorsHeader,
    RowError(&'a str),
    Failure(&'a str),
}

impl fmt::Display for ReportLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLine::Summary(summary) => write!(f, "✓ {}", summary),
            ReportLine::Outcome(outcome) => {
                let marker = match outcome.action {
                    Action::Created => "+",
                    Action::Updated => "↻",
                };
                write!(f, "{} {}: {}", marker, outcome.username, outcome.grade)
            }
            ReportLine::ErrorsHeader => write!(f, "Errors:"),
            ReportLine::RowError(error) => write!(f, "✗ {}", error),
            ReportLine::Failure(message) => write!(f, "✗ {}", message),
        }
    }
}
