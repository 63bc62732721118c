pub mod delivery;
pub mod group;
pub mod message;
pub mod router;
pub mod session;

pub use delivery::{delivery_channel, DeliveryJob, DeliveryQueue, DeliveryWorker, MpscDeliveryQueue};
pub use group::{ConnectionId, GroupPublisher, GroupRegistry, SUBSCRIBER_CHANNEL_CAPACITY};
pub use message::{FrameEncoding, OutboundFrame, COMPRESSION_THRESHOLD_BYTES};
pub use router::{IngestOutcome, LiveFanoutRouter, TIMESTAMP_FORMAT};
pub use session::SubscriberSession;

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use delivery::MockDeliveryQueue;
#[cfg(any(test, feature = "testing"))]
pub use group::MockGroupPublisher;
