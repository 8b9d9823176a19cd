pub mod ledger;
pub mod notification;

pub use ledger::StoreCreditLedger;
pub use notification::LoggingNotificationSink;
