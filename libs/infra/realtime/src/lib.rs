pub mod hub;
pub mod publisher;

pub use hub::{ConnId, Hub};
pub use publisher::HubEventPublisher;
