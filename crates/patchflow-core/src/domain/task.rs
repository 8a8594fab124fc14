//! Per-task inputs and the snapshots produced by CI and review.

use serde::{Deserialize, Serialize};

/// Identifies one workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub ticket_id: String,
    pub repository: String,
    pub base_branch: String,
}

impl TaskInput {
    pub fn new(
        ticket_id: impl Into<String>,
        repository: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            repository: repository.into(),
            base_branch: base_branch.into(),
        }
    }
}

/// Outcome of one CI attempt for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CiResult {
    pub passed: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl CiResult {
    pub fn passed() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            url: None,
            details: Some(details.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Reviewer state for an open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewResult {
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl ReviewResult {
    pub fn approved() -> Self {
        Self {
            approved: true,
            feedback: None,
        }
    }

    pub fn changes_requested(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            feedback: Some(feedback.into()),
        }
    }
}
