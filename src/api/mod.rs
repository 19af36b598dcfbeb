//! Margin-data service client.

mod margin_client;
mod types;

pub use margin_client::{MarginClient, DEFAULT_MARGIN_API_BASE};
