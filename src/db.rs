pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod cash_session_repo;
pub use cash_session_repo::CashSessionRepository;
pub mod ledger_repo;
pub use ledger_repo::LedgerRepository;
pub mod reconciliation_repo;
pub use reconciliation_repo::ReconciliationRepository;
pub mod closing_repo;
pub use closing_repo::ClosingRepository;
