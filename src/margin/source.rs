//! Where margin lists come from.

use anyhow::Result;
use async_trait::async_trait;

use crate::api::MarginClient;
use crate::models::MarginEntry;

/// Supplier of the per-symbol margin list.
#[async_trait]
pub trait MarginSource: Send + Sync {
    async fn fetch_margins(&self) -> Result<Vec<MarginEntry>>;
}

#[async_trait]
impl MarginSource for MarginClient {
    async fn fetch_margins(&self) -> Result<Vec<MarginEntry>> {
        self.get_margins().await
    }
}
