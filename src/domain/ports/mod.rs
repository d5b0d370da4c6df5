//! Domain ports (interfaces) for the coordination substrate.

pub mod notification_handler;
pub mod publisher;
pub mod review_executor;
pub mod swarm_store;

pub use notification_handler::NotificationHandler;
pub use publisher::CoordinationPublisher;
pub use review_executor::{ReviewExecutor, ReviewRun};
pub use swarm_store::SwarmStore;
