//! Adapters binding external collaborators to the [`Toolkit`](crate::Toolkit).
//!
//! - [`agents`]: one trait per collaborator and the composing `AgentsToolkit`
//! - [`review`]: correlation-keyed review signal gateway

pub mod agents;
pub mod review;

pub use agents::{
    AgentsToolkit, AgentsToolkitBuilder, CiRunner, Coder, FeedbackResolver, Planner,
    PullRequests, Retriever, ReviewChannel, ToolkitBuildError,
};
pub use review::{
    GatewayError, InProcessSignalGateway, ReviewAwaiter, ReviewCorrelation, ReviewSignalGateway,
};
