pub mod catalog;
pub mod cash_session;
pub mod ledger;
pub mod reconciliation;
pub mod closing;
