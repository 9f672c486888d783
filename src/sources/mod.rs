//! Source adapters for the external market venues.
//!
//! Each venue implements [`MarketSource`]; the walker and enricher are
//! generic over it. Wire payloads are validated here, at the adapter
//! boundary, so the core pipeline only ever sees well-formed domain types.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::FetchError;
use crate::config::Pacing;
use crate::types::{Market, OrderBook, TokenRef};

mod opinion;
mod predict;

pub use opinion::OpinionSource;
pub use predict::PredictSource;

/// One page of the listing endpoint.
#[derive(Debug)]
pub struct ListingPage {
    pub markets: Vec<Market>,
    /// Token for the next page; `None` means the listing is exhausted.
    pub next_token: Option<String>,
}

/// Detail payload for a single dispatched token reference.
#[derive(Debug, Default)]
pub struct TokenDetail {
    pub book: Option<OrderBook>,
    pub stats: Option<Value>,
}

/// A paginated market venue with per-token detail data.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Short identifier used in logs and snapshot paths.
    fn name(&self) -> &'static str;

    /// The rate budget this source must stay under.
    fn pacing(&self) -> &Pacing;

    /// Fetch one listing page. `page_token` is `None` for the first page.
    async fn fetch_page(&self, page_token: Option<String>) -> Result<ListingPage, FetchError>;

    /// Fetch detail data for one non-absent token reference.
    async fn fetch_detail(&self, token: &TokenRef) -> Result<TokenDetail, FetchError>;
}

/// Ids arrive as strings on one venue and numbers on the other.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
