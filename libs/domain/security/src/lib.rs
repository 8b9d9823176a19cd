//! Zero-trust security control plane (C1) and policy engine (C2).
//!
//! [`ControlPlane::authorize`] is the single entry point: it builds a
//! [`SecurityContext`], consults the decision cache, falls through to the
//! [`PolicyEngine`] on a miss, and always emits exactly one audit event.

pub mod audit;
pub mod cache;
pub mod control_plane;
pub mod policy;
pub mod risk;

pub use audit::{AuditSink, AuditWriter};
pub use cache::DecisionCache;
pub use control_plane::{AuthorizeRequest, ControlPlane};
pub use policy::PolicyEngine;
pub use risk::RequestSignals;
