pub mod codegen;
pub mod locks;
pub mod service;
pub mod sideeffects;
pub mod transitions;

pub use codegen::generate_candidate;
pub use service::LettersService;
pub use sideeffects::{CreditLedger, EventPublisher, NotificationSink};
pub use transitions::is_allowed;
