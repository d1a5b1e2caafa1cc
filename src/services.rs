pub mod availability_service;
pub use availability_service::AvailabilityService;
pub mod hold_service;
pub use hold_service::HoldService;
pub mod ledger_service;
pub use ledger_service::LedgerService;
pub mod reaper;
