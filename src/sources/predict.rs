//! Predict-style venue adapter.
//!
//! Opaque cursor pagination over `GET /markets`, `{success, data, cursor}`
//! envelopes, and per-market detail: order book and stats fetched
//! concurrently under the same admission slot. Every market is binary with
//! a yes-side order book; No quotes are derived by complement at the
//! market's declared precision.

use anyhow::Result;
use async_trait::async_trait;
use futures::join;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{id_string, ListingPage, MarketSource, TokenDetail};
use crate::client::{FetchError, HttpExecutor};
use crate::config::{Pacing, SourceConfig};
use crate::types::{Market, MarketKind, OrderBook, Side, TokenRef, TokenSlot};

const DEFAULT_PRECISION: u32 = 2;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    decimal_precision: Option<u32>,
    #[serde(default, rename = "volume24h")]
    volume_24h: Option<Decimal>,
}

pub struct PredictSource {
    executor: HttpExecutor,
    base_url: String,
    pacing: Pacing,
}

impl PredictSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let executor = HttpExecutor::new(
            config.request_timeout,
            config.retry.clone(),
            &[
                ("x-api-key", &config.api_key),
                ("accept", "application/json"),
            ],
        )?;
        Ok(Self {
            executor,
            base_url: config.base_url.clone(),
            pacing: config.pacing.clone(),
        })
    }

    /// Unwrap a `{success, data}` envelope, tolerating a missing data field.
    async fn fetch_enveloped(&self, url: &str) -> Result<Value, FetchError> {
        let payload = self.executor.get_json(url, &[]).await?;
        let envelope: Envelope = serde_json::from_value(payload)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        if !envelope.success {
            return Err(FetchError::Envelope("success=false".to_string()));
        }
        envelope
            .data
            .ok_or_else(|| FetchError::DataShape("missing data field".to_string()))
    }
}

fn to_market(raw: Value) -> Option<Market> {
    let raw: RawMarket = match serde_json::from_value(raw) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "skipping malformed market row");
            return None;
        }
    };

    let id = raw.id.as_ref().and_then(id_string)?;
    // The detail endpoints are addressed by market id, so the market's
    // single yes-side work item carries the market id as its token.
    let token = TokenRef::new(id.clone(), Side::Yes);
    Some(Market {
        id,
        title: raw.title.unwrap_or_default(),
        kind: MarketKind::Binary,
        volume_24h: raw.volume_24h,
        decimal_precision: raw.decimal_precision.unwrap_or(DEFAULT_PRECISION),
        tokens: vec![TokenSlot::new(token)],
        children: Vec::new(),
    })
}

#[async_trait]
impl MarketSource for PredictSource {
    fn name(&self) -> &'static str {
        "predict"
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    async fn fetch_page(&self, page_token: Option<String>) -> Result<ListingPage, FetchError> {
        let mut query = vec![
            ("status", "OPEN".to_string()),
            ("first", self.pacing.page_size.to_string()),
            ("sort", "VOLUME_24H_DESC".to_string()),
        ];
        if let Some(after) = &page_token {
            query.push(("after", after.clone()));
        }

        let payload = self
            .executor
            .get_json(&format!("{}/markets", self.base_url), &query)
            .await?;
        let envelope: Envelope = serde_json::from_value(payload)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        if !envelope.success {
            return Err(FetchError::Envelope("success=false".to_string()));
        }

        let rows: Vec<Value> = match envelope.data {
            Some(Value::Array(rows)) => rows,
            Some(other) => {
                return Err(FetchError::DataShape(format!(
                    "expected market array, got {}",
                    other
                )))
            }
            None => Vec::new(),
        };
        let markets: Vec<Market> = rows.into_iter().filter_map(to_market).collect();

        let next_token = envelope.cursor.filter(|c| !c.is_empty());
        Ok(ListingPage {
            markets,
            next_token,
        })
    }

    async fn fetch_detail(&self, token: &TokenRef) -> Result<TokenDetail, FetchError> {
        let book_url = format!("{}/markets/{}/orderbook", self.base_url, token.id);
        let stats_url = format!("{}/markets/{}/stats", self.base_url, token.id);

        // Both sub-fetches share one admission slot; run them together.
        let (book, stats) = join!(
            self.fetch_enveloped(&book_url),
            self.fetch_enveloped(&stats_url)
        );

        // The order book is the payload that matters; stats are optional
        // garnish and their failure is not an item failure.
        let book: OrderBook = serde_json::from_value(book?)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        let stats = match stats {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(market = %token.id, error = %e, "stats fetch failed");
                None
            }
        };

        Ok(TokenDetail {
            book: Some(book),
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn market_row_maps_to_single_yes_slot() {
        let market = to_market(json!({
            "id": "mkt_1",
            "title": "BTC above 100k?",
            "decimalPrecision": 3,
            "volume24h": 9000.5
        }))
        .unwrap();

        assert_eq!(market.id, "mkt_1");
        assert_eq!(market.decimal_precision, 3);
        assert_eq!(market.tokens.len(), 1);
        assert_eq!(market.tokens[0].token, TokenRef::new("mkt_1", Side::Yes));
    }

    #[test]
    fn precision_defaults_to_two() {
        let market = to_market(json!({"id": 5})).unwrap();
        assert_eq!(market.decimal_precision, 2);
    }

    #[test]
    fn row_without_id_is_dropped() {
        assert!(to_market(json!({"title": "orphan"})).is_none());
    }
}
