//! API response types for the margin-data service.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::MarginEntry;

/// One row from the /margins endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginResponse {
    #[serde(alias = "tradingsymbol", alias = "ticker")]
    pub symbol: String,
    #[serde(alias = "leverage", alias = "multiplier")]
    pub margin: Decimal,
}

/// The service returns either a bare array or an envelope with `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarginListResponse {
    List(Vec<MarginResponse>),
    Envelope { data: Vec<MarginResponse> },
}

impl MarginListResponse {
    pub fn into_entries(self) -> Vec<MarginEntry> {
        let rows = match self {
            MarginListResponse::List(rows) => rows,
            MarginListResponse::Envelope { data } => data,
        };

        rows.into_iter()
            .map(|r| MarginEntry::new(r.symbol, r.margin))
            .collect()
    }
}
