//! Signal-based review waits.
//!
//! A task that has opened a pull request parks under a [`ReviewCorrelation`]
//! key until a reviewer decision is delivered for that key. The signal may
//! arrive before or after the task starts waiting; an early signal is held
//! until it is consumed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, instrument};

use super::agents::ReviewChannel;
use crate::domain::{ReviewResult, TaskInput};

/// Identifies one parked review wait.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewCorrelation {
    pub ticket_id: String,
    pub pr_url: String,
}

impl ReviewCorrelation {
    pub fn new(ticket_id: impl Into<String>, pr_url: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            pr_url: pr_url.into(),
        }
    }

    pub fn for_task(task: &TaskInput, pr_url: &str) -> Self {
        Self::new(task.ticket_id.clone(), pr_url)
    }
}

impl std::fmt::Display for ReviewCorrelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.ticket_id, self.pr_url)
    }
}

/// Errors produced while waiting for or delivering a review signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("review for {key} already has an undelivered signal")]
    AlreadySignalled { key: String },

    #[error("a task is already waiting for review on {key}")]
    AlreadyWaiting { key: String },

    #[error("no review signal for {key} within {timeout_secs}s")]
    TimedOut { key: String, timeout_secs: u64 },

    #[error("review wait for {key} was abandoned")]
    Abandoned { key: String },
}

/// Delivers reviewer decisions to parked tasks.
#[async_trait]
pub trait ReviewSignalGateway: Send + Sync {
    async fn wait_for_review(&self, key: &ReviewCorrelation) -> Result<ReviewResult, GatewayError>;
}

enum Slot {
    Waiting(oneshot::Sender<ReviewResult>),
    Delivered(ReviewResult),
}

/// In-process gateway backed by one-shot channels.
///
/// Suitable for a single host process. A durable deployment would persist
/// the slots instead.
#[derive(Default)]
pub struct InProcessSignalGateway {
    slots: Mutex<HashMap<ReviewCorrelation, Slot>>,
    timeout: Option<Duration>,
}

impl InProcessSignalGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every wait; typically the `AwaitReview` activity timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Deliver a reviewer decision for `key`.
    ///
    /// Resumes the parked task if one is waiting, otherwise holds the signal
    /// until the next `wait_for_review` for the same key.
    #[instrument(skip(self, key, review), fields(key = %key, approved = review.approved))]
    pub async fn deliver(
        &self,
        key: ReviewCorrelation,
        review: ReviewResult,
    ) -> Result<(), GatewayError> {
        let mut slots = self.slots.lock().await;
        match slots.remove(&key) {
            Some(Slot::Waiting(sender)) => {
                if let Err(review) = sender.send(review) {
                    // Waiter gave up (timed out or dropped); keep the signal.
                    slots.insert(key, Slot::Delivered(review));
                }
                debug!("review signal delivered");
                Ok(())
            }
            Some(Slot::Delivered(previous)) => {
                let err = GatewayError::AlreadySignalled {
                    key: key.to_string(),
                };
                slots.insert(key, Slot::Delivered(previous));
                Err(err)
            }
            None => {
                slots.insert(key, Slot::Delivered(review));
                debug!("review signal buffered");
                Ok(())
            }
        }
    }

    /// Keys with a live task currently parked on them.
    pub async fn pending(&self) -> Vec<ReviewCorrelation> {
        let slots = self.slots.lock().await;
        let mut keys: Vec<ReviewCorrelation> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Waiting(sender) if !sender.is_closed()))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_by(|a, b| (&a.ticket_id, &a.pr_url).cmp(&(&b.ticket_id, &b.pr_url)));
        keys
    }

    async fn clear_waiter(&self, key: &ReviewCorrelation) {
        let mut slots = self.slots.lock().await;
        if matches!(slots.get(key), Some(Slot::Waiting(sender)) if sender.is_closed()) {
            slots.remove(key);
        }
    }
}

#[async_trait]
impl ReviewSignalGateway for InProcessSignalGateway {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn wait_for_review(&self, key: &ReviewCorrelation) -> Result<ReviewResult, GatewayError> {
        let receiver = {
            let mut slots = self.slots.lock().await;
            match slots.remove(key) {
                Some(Slot::Delivered(review)) => return Ok(review),
                Some(Slot::Waiting(sender)) if !sender.is_closed() => {
                    slots.insert(key.clone(), Slot::Waiting(sender));
                    return Err(GatewayError::AlreadyWaiting {
                        key: key.to_string(),
                    });
                }
                // Free, or the previous waiter was dropped mid-wait.
                Some(Slot::Waiting(_)) | None => {
                    let (sender, receiver) = oneshot::channel();
                    slots.insert(key.clone(), Slot::Waiting(sender));
                    receiver
                }
            }
        };
        debug!("parked awaiting review signal");

        let received = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    self.clear_waiter(key).await;
                    return Err(GatewayError::TimedOut {
                        key: key.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
            },
            None => receiver.await,
        };

        received.map_err(|_| GatewayError::Abandoned {
            key: key.to_string(),
        })
    }
}

/// Adapts a [`ReviewSignalGateway`] to the [`ReviewChannel`] adapter slot.
pub struct ReviewAwaiter<G> {
    gateway: G,
}

impl<G: ReviewSignalGateway> ReviewAwaiter<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

#[async_trait]
impl<G: ReviewSignalGateway> ReviewChannel for ReviewAwaiter<G> {
    async fn resolve(&self, task: &TaskInput, pr_url: &str) -> anyhow::Result<ReviewResult> {
        let key = ReviewCorrelation::for_task(task, pr_url);
        Ok(self.gateway.wait_for_review(&key).await?)
    }
}

#[async_trait]
impl<G: ReviewSignalGateway + ?Sized> ReviewSignalGateway for std::sync::Arc<G> {
    async fn wait_for_review(&self, key: &ReviewCorrelation) -> Result<ReviewResult, GatewayError> {
        (**self).wait_for_review(key).await
    }
}
