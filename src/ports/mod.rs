pub mod admin;
pub mod ledger;
