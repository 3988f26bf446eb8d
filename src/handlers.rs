pub mod catalog;
pub mod cash_session;
pub mod sales;
