//! Application services for the coordination substrate.

pub mod activity_folder;
pub mod aggregator;
pub mod coordination;
pub mod reviewers;
pub mod swarm_dispatcher;
pub mod swarm_session;

pub use activity_folder::{fold_activities, ActivityService};
pub use aggregator::ResultAggregator;
pub use coordination::{
    coordination_client, reset_coordination_client, CoordinationClient, HealthReport,
    PublishRequest,
};
pub use reviewers::{
    default_registry, PerformanceReviewer, ReviewerRegistry, SecurityReviewer,
    SpecializedReviewer, StyleReviewer,
};
pub use swarm_dispatcher::{SwarmAdmission, SwarmDispatcher, DISPATCHER_INSTANCE};
pub use swarm_session::SwarmSessionManager;
