pub mod notifier;
pub mod reconciliation_service;
pub mod ledger_service;
pub mod pending_service;
pub mod cash_session_service;
pub mod closing_service;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cash_session_service::CashSessionService;
pub use closing_service::ClosingService;
pub use ledger_service::LedgerService;
pub use notifier::OpeningNotifier;
pub use pending_service::PendingService;
pub use reconciliation_service::ReconciliationService;
