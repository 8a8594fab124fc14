//! Declarative workflow metadata for the durable-execution host.
//!
//! Nothing in the orchestrator reads this. A host uses it to decide how long
//! to keep a task alive, how to retry a step after a transient failure, and
//! which signal wakes a task parked on review.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Step;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Name of the signal that resumes a task parked in `AwaitReview`.
pub const REVIEW_SIGNAL: &str = "review";

/// Errors from [`WorkflowSpec::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowSpecError {
    #[error("activities must cover every step in pipeline order, got {found:?}")]
    ActivityOrder { found: Vec<String> },

    #[error("activity {activity} must have a positive timeout")]
    ZeroTimeout { activity: String },

    #[error("activity {activity} must allow at least one attempt")]
    ZeroAttempts { activity: String },

    #[error("activity {activity} has a backoff coefficient below 1.0 or not finite")]
    InvalidBackoff { activity: String },

    #[error("workflow must declare the \"review\" signal")]
    MissingReviewSignal,

    #[error("sleep timeout must be positive")]
    ZeroSleepTimeout,
}

/// Retry policy the host applies to an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub maximum_attempts: u32,
    #[serde(with = "duration_secs", rename = "initial_interval_secs")]
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            initial_interval: Duration::from_secs(10),
            backoff_coefficient: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based: the first retry is attempt 1).
    ///
    /// Returns `None` once the attempt budget is spent. Delays too large for
    /// a `Duration` saturate at `Duration::MAX`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.maximum_attempts {
            return None;
        }
        if self.initial_interval.is_zero() {
            return Some(Duration::ZERO);
        }
        let factor = self.backoff_coefficient.max(1.0).powf(f64::from(attempt - 1));
        let secs = self.initial_interval.as_secs_f64() * factor;
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }
}

/// One activity the host schedules, matching one orchestrator step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowActivity {
    pub name: Step,
    #[serde(with = "duration_secs", rename = "timeout_secs")]
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl WorkflowActivity {
    pub fn new(name: Step, timeout: Duration) -> Self {
        Self {
            name,
            timeout,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// An asynchronous event the host must be able to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSignal {
    pub name: String,
    pub description: String,
}

/// Named collection of activities, signals and the suspension budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    pub activities: Vec<WorkflowActivity>,
    pub signals: Vec<WorkflowSignal>,
    #[serde(with = "duration_secs", rename = "sleep_timeout_secs")]
    pub sleep_timeout: Duration,
}

impl Default for WorkflowSpec {
    fn default() -> Self {
        let minutes = |m: u64| Duration::from_secs(m * MINUTE);
        Self {
            name: "CodingTaskWorkflow".to_string(),
            activities: vec![
                WorkflowActivity::new(Step::PlanChanges, minutes(3)),
                WorkflowActivity::new(Step::FetchContext, minutes(2)),
                WorkflowActivity::new(Step::ApplyDiffs, minutes(10)),
                WorkflowActivity::new(Step::RunCi, minutes(30)),
                WorkflowActivity::new(Step::OpenPr, minutes(5)),
                WorkflowActivity::new(Step::AwaitReview, Duration::from_secs(2 * DAY)),
                WorkflowActivity::new(Step::AddressFeedback, minutes(15)),
            ],
            signals: vec![WorkflowSignal {
                name: REVIEW_SIGNAL.to_string(),
                description: "Signal emitted when a reviewer responds; resumes the workflow"
                    .to_string(),
            }],
            sleep_timeout: Duration::from_secs(12 * HOUR),
        }
    }
}

impl WorkflowSpec {
    pub fn activity(&self, step: Step) -> Option<&WorkflowActivity> {
        self.activities.iter().find(|a| a.name == step)
    }

    pub fn signal(&self, name: &str) -> Option<&WorkflowSignal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// How long a task may stay parked waiting for the review signal.
    pub fn review_timeout(&self) -> Option<Duration> {
        self.activity(Step::AwaitReview).map(|a| a.timeout)
    }

    pub fn validate(&self) -> Result<(), WorkflowSpecError> {
        let names: Vec<Step> = self.activities.iter().map(|a| a.name).collect();
        if names != Step::ALL {
            return Err(WorkflowSpecError::ActivityOrder {
                found: names.iter().map(|s| s.to_string()).collect(),
            });
        }
        for activity in &self.activities {
            if activity.timeout.is_zero() {
                return Err(WorkflowSpecError::ZeroTimeout {
                    activity: activity.name.to_string(),
                });
            }
            if activity.retry_policy.maximum_attempts == 0 {
                return Err(WorkflowSpecError::ZeroAttempts {
                    activity: activity.name.to_string(),
                });
            }
            let backoff = activity.retry_policy.backoff_coefficient;
            if !backoff.is_finite() || backoff < 1.0 {
                return Err(WorkflowSpecError::InvalidBackoff {
                    activity: activity.name.to_string(),
                });
            }
        }
        if self.signal(REVIEW_SIGNAL).is_none() {
            return Err(WorkflowSpecError::MissingReviewSignal);
        }
        if self.sleep_timeout.is_zero() {
            return Err(WorkflowSpecError::ZeroSleepTimeout);
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
