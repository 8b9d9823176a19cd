mod audit_repository;
mod barcode_repository;
mod courier_repository;
mod credit_repository;
mod letter_repository;
mod opcode_repository;
mod user_repository;

pub use audit_repository::AuditRepository;
pub use barcode_repository::BarcodeRepository;
pub use courier_repository::CourierRepository;
pub use credit_repository::CreditRepository;
pub use letter_repository::LetterRepository;
pub use opcode_repository::OpCodeRepository;
pub use user_repository::UserRepository;
