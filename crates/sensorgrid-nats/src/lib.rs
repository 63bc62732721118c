pub mod client;
pub mod publisher;
pub mod relay;

pub use client::NatsClient;
pub use publisher::{group_from_subject, group_subject, NatsGroupPublisher, LIVE_SUBJECT_PREFIX};
pub use relay::NatsLiveRelay;
