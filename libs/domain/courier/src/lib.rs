pub mod authorization;
pub mod dispatch;
pub mod service;

pub use authorization::{can_reassign, can_review_promotion};
pub use dispatch::{eligible_candidates, pick_assignee, ESCALATION_ORDER};
pub use service::CourierService;
