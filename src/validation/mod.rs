//! Parsing and validation of raw calculator input.

mod form;
mod holding;

pub use form::TradeForm;
