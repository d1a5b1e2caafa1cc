pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod hold_repo;
pub use hold_repo::HoldRepository;
pub mod ledger_repo;
pub use ledger_repo::LedgerRepository;
