pub mod audit_sink;
pub mod client;
pub mod errors;
pub mod repositories;
mod schema;

pub use audit_sink::StoreAuditSink;
pub use client::StoreClient;
pub use errors::StoreError;
pub use repositories::{
    AuditRepository, BarcodeRepository, CourierRepository, CreditRepository, LetterRepository, OpCodeRepository,
    UserRepository,
};
