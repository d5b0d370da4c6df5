//! Redis adapters for the coordination substrate.
//!
//! All on-Redis state is owned here: key naming, wire codecs, the
//! coordination store, presence tracking, notification fan-out and the
//! swarm session store.

pub mod codec;
pub mod keys;
pub mod notifications;
pub mod presence;
pub mod store;
pub mod swarm_store;

pub use keys::{presence_field, split_presence_field, CoordinationKeys, SwarmKeys};
pub use notifications::{NotificationBus, SubscriptionHandle};
pub use presence::PresenceTracker;
pub use store::CoordinationStore;
pub use swarm_store::RedisSwarmStore;
