//! Core domain types shared across the scan pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Which outcome a token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

/// Market structure as reported by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Binary,
    Categorical,
}

/// Reference to an outcome token on a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub id: String,
    pub side: Side,
}

impl TokenRef {
    pub fn new(id: impl Into<String>, side: Side) -> Self {
        Self {
            id: id.into(),
            side,
        }
    }

    /// Both venues use an empty string or `"0"` as a placeholder for a token
    /// that does not exist. Absent tokens must never reach a detail endpoint.
    pub fn is_absent(&self) -> bool {
        self.id.is_empty() || self.id == "0"
    }
}

/// One resting level of an order book ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// The wire formats disagree on level shape: one venue sends
/// `{"price": "0.55", "size": "10"}` objects, the other `[0.55, 10.0]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Object { price: Decimal, size: Decimal },
    Pair(Decimal, Decimal),
}

impl From<LevelRepr> for PriceLevel {
    fn from(repr: LevelRepr) -> Self {
        match repr {
            LevelRepr::Object { price, size } => Self { price, size },
            LevelRepr::Pair(price, size) => Self { price, size },
        }
    }
}

fn ladder<'de, D>(deserializer: D) -> Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let levels = Vec::<LevelRepr>::deserialize(deserializer)?;
    Ok(levels.into_iter().map(Into::into).collect())
}

/// Order book for a single token. Either ladder may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default, deserialize_with = "ladder")]
    pub bids: Vec<PriceLevel>,
    #[serde(default, deserialize_with = "ladder")]
    pub asks: Vec<PriceLevel>,
}

/// Executable quote for one side of a market. `buy` is what you would pay
/// (best ask), `sell` is what you would receive (best bid).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideQuote {
    pub buy: Option<Decimal>,
    pub sell: Option<Decimal>,
}

/// Quotes for both outcomes, the No side derived by complement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPrices {
    pub yes: SideQuote,
    pub no: SideQuote,
}

/// One token's slot on a market. Enrichment fields start empty and are
/// filled in place by the enricher; a failed fetch leaves them empty and
/// records the reason.
#[derive(Debug, Clone, Serialize)]
pub struct TokenSlot {
    pub token: TokenRef,
    pub book: Option<OrderBook>,
    pub prices: Option<MarketPrices>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenSlot {
    pub fn new(token: TokenRef) -> Self {
        Self {
            token,
            book: None,
            prices: None,
            stats: None,
            error: None,
        }
    }
}

/// A market discovered by the pagination walker. Categorical markets carry
/// their outcomes as `children` (one level deep); binary markets carry
/// yes/no token slots directly.
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub id: String,
    pub title: String,
    pub kind: MarketKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,
    pub decimal_precision: u32,
    pub tokens: Vec<TokenSlot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Market>,
}

/// Final, immutable scan output. Market order equals listing discovery
/// order; `token_count` counts token references actually dispatched.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub market_count: usize,
    pub token_count: usize,
    pub markets: Vec<Market>,
}
