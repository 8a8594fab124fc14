//! Planning artifacts: [`ChangePlan`] and [`PlannedEdit`].

use serde::{Deserialize, Serialize};

use super::error::PlanError;

/// A single planned edit in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEdit {
    pub path: String,
    pub intent: String,
}

impl PlannedEdit {
    pub fn new(path: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            path: path.into().trim().to_string(),
            intent: intent.into().trim().to_string(),
        }
    }
}

/// Planner output that every later step consumes.
///
/// Created once per task and only ever passed by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePlan {
    pub ticket_id: String,
    pub goal: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub edits: Vec<PlannedEdit>,
    #[serde(default)]
    pub risk: Vec<String>,
    #[serde(default)]
    pub checks: Vec<String>,
}

impl ChangePlan {
    pub fn new(ticket_id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into().trim().to_string(),
            goal: goal.into().trim().to_string(),
            constraints: Vec::new(),
            edits: Vec::new(),
            risk: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn with_edit(mut self, path: impl Into<String>, intent: impl Into<String>) -> Self {
        self.edits.push(PlannedEdit::new(path, intent));
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into().trim().to_string());
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risk.push(risk.into().trim().to_string());
        self
    }

    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.checks.push(check.into().trim().to_string());
        self
    }

    /// Decode a plan from JSON, trimming surrounding whitespace from every
    /// string field. Structural validation is left to [`ChangePlan::validate`].
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: ChangePlan = serde_json::from_str(json)?;
        Ok(raw.trimmed())
    }

    fn trimmed(self) -> Self {
        fn trim_all(items: Vec<String>) -> Vec<String> {
            items.into_iter().map(|s| s.trim().to_string()).collect()
        }
        Self {
            ticket_id: self.ticket_id.trim().to_string(),
            goal: self.goal.trim().to_string(),
            constraints: trim_all(self.constraints),
            edits: self
                .edits
                .into_iter()
                .map(|e| PlannedEdit::new(e.path, e.intent))
                .collect(),
            risk: trim_all(self.risk),
            checks: trim_all(self.checks),
        }
    }

    /// True when at least one check mentions testing (case-insensitive).
    pub fn has_test_check(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.to_lowercase().contains("test"))
    }

    /// Edit paths in plan order.
    pub fn edit_paths(&self) -> Vec<&str> {
        self.edits.iter().map(|e| e.path.as_str()).collect()
    }

    /// Check every structural invariant of the plan.
    ///
    /// The test-coverage rule is checked last so that a plan with a broken
    /// edit list reports the edit problem first.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.ticket_id.is_empty() {
            return Err(PlanError::EmptyTicketId);
        }
        if self.edits.is_empty() {
            return Err(PlanError::NoEdits);
        }
        for edit in &self.edits {
            validate_relative_path(&edit.path)?;
            if edit.intent.is_empty() {
                return Err(PlanError::EmptyIntent {
                    path: edit.path.clone(),
                });
            }
        }
        if !self.has_test_check() {
            return Err(PlanError::MissingTestCheck);
        }
        Ok(())
    }

    /// Validate the plan and confirm it belongs to `ticket_id`.
    pub fn validate_for(&self, ticket_id: &str) -> Result<(), PlanError> {
        if self.ticket_id != ticket_id {
            return Err(PlanError::TicketMismatch {
                plan: self.ticket_id.clone(),
                task: ticket_id.to_string(),
            });
        }
        self.validate()
    }

    /// SHA-256 hex digest of the plan's JSON encoding.
    ///
    /// Field order is fixed by the struct definition, so equal plans always
    /// produce equal digests.
    pub fn digest(&self) -> String {
        use sha2::Digest as _;
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(sha2::Sha256::digest(&bytes))
    }
}

/// Reject absolute paths, `..` traversal and empty or blank segments.
///
/// Backslashes are treated as separators.
pub fn validate_relative_path(path: &str) -> Result<(), PlanError> {
    let invalid = |reason| PlanError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("path must not be empty"));
    }
    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(invalid("path must be relative"));
    }
    if normalized
        .split('/')
        .any(|segment| segment.trim().is_empty() || segment == "..")
    {
        return Err(invalid(
            "path must not traverse parent directories or contain empty segments",
        ));
    }
    Ok(())
}
