//! Opinion-style venue adapter.
//!
//! Page-number pagination over `GET /market`, `{errno, result}` envelopes,
//! and one order book per outcome token. Binary markets carry yes/no token
//! ids directly; categorical markets nest child markets, each with its own
//! yes token.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{id_string, ListingPage, MarketSource, TokenDetail};
use crate::client::{FetchError, HttpExecutor};
use crate::config::{Pacing, SourceConfig};
use crate::types::{Market, MarketKind, OrderBook, Side, TokenRef, TokenSlot};

/// Default price precision for complement quotes; the venue does not
/// publish one per market.
const DEFAULT_PRECISION: u32 = 2;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "missing_errno")]
    errno: i64,
    #[serde(default)]
    result: Option<Value>,
}

// A response without an errno field is treated as a failure envelope.
fn missing_errno() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    #[serde(default)]
    market_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    market_type: Option<i64>,
    #[serde(default)]
    yes_token_id: Option<String>,
    #[serde(default)]
    no_token_id: Option<String>,
    #[serde(default)]
    volume: Option<Decimal>,
    #[serde(default)]
    child_markets: Vec<RawChild>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChild {
    #[serde(default)]
    market_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    yes_token_id: Option<String>,
}

pub struct OpinionSource {
    executor: HttpExecutor,
    base_url: String,
    pacing: Pacing,
}

impl OpinionSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let executor = HttpExecutor::new(
            config.request_timeout,
            config.retry.clone(),
            &[("apikey", &config.api_key), ("User-Agent", "Mozilla/5.0")],
        )?;
        Ok(Self {
            executor,
            base_url: config.base_url.clone(),
            pacing: config.pacing.clone(),
        })
    }

    fn unwrap_envelope(&self, payload: Value) -> Result<Value, FetchError> {
        let envelope: Envelope = serde_json::from_value(payload)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        if envelope.errno != 0 {
            return Err(FetchError::Envelope(format!("errno {}", envelope.errno)));
        }
        envelope
            .result
            .ok_or_else(|| FetchError::DataShape("missing result field".to_string()))
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

    let id = raw.market_id.as_ref().and_then(id_string)?;
    let kind = match raw.market_type {
        Some(1) => MarketKind::Categorical,
        _ => MarketKind::Binary,
    };

    let mut tokens = Vec::new();
    let mut children = Vec::new();
    match kind {
        MarketKind::Binary => {
            tokens.push(TokenSlot::new(TokenRef::new(
                raw.yes_token_id.unwrap_or_default(),
                Side::Yes,
            )));
            tokens.push(TokenSlot::new(TokenRef::new(
                raw.no_token_id.unwrap_or_default(),
                Side::No,
            )));
        }
        MarketKind::Categorical => {
            for child in raw.child_markets {
                let Some(child_id) = child.market_id.as_ref().and_then(id_string) else {
                    warn!(parent = %id, "skipping child market without an id");
                    continue;
                };
                children.push(Market {
                    id: child_id,
                    title: child.title.unwrap_or_default(),
                    kind: MarketKind::Binary,
                    volume_24h: None,
                    decimal_precision: DEFAULT_PRECISION,
                    tokens: vec![TokenSlot::new(TokenRef::new(
                        child.yes_token_id.unwrap_or_default(),
                        Side::Yes,
                    ))],
                    children: Vec::new(),
                });
            }
        }
    }

    Some(Market {
        id,
        title: raw.title.unwrap_or_default(),
        kind,
        volume_24h: raw.volume,
        decimal_precision: DEFAULT_PRECISION,
        tokens,
        children,
    })
}

#[async_trait]
impl MarketSource for OpinionSource {
    fn name(&self) -> &'static str {
        "opinion"
    }

    fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    async fn fetch_page(&self, page_token: Option<String>) -> Result<ListingPage, FetchError> {
        let page: u64 = match page_token {
            None => 1,
            Some(token) => token
                .parse()
                .map_err(|_| FetchError::DataShape(format!("bad page token: {}", token)))?,
        };

        let query = [
            ("status", "activated".to_string()),
            ("marketType", "2".to_string()),
            ("limit", self.pacing.page_size.to_string()),
            ("page", page.to_string()),
        ];
        let payload = self
            .executor
            .get_json(&format!("{}/market", self.base_url), &query)
            .await?;
        let result = self.unwrap_envelope(payload)?;

        let listing: Listing = serde_json::from_value(result)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        let markets: Vec<Market> = listing.list.into_iter().filter_map(to_market).collect();

        let next_token = if markets.is_empty() {
            None
        } else {
            Some((page + 1).to_string())
        };
        Ok(ListingPage {
            markets,
            next_token,
        })
    }

    async fn fetch_detail(&self, token: &TokenRef) -> Result<TokenDetail, FetchError> {
        let query = [("token_id", token.id.clone())];
        let payload = self
            .executor
            .get_json(&format!("{}/token/orderbook", self.base_url), &query)
            .await?;
        let result = self.unwrap_envelope(payload)?;
        let book: OrderBook = serde_json::from_value(result)
            .map_err(|e| FetchError::DataShape(e.to_string()))?;
        Ok(TokenDetail {
            book: Some(book),
            stats: None,
        })
    }
}
