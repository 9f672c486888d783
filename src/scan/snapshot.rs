//! Final snapshot assembly.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::types::{Market, Snapshot};

/// Merge the enriched market list into the immutable snapshot.
///
/// Market order is the walker's discovery order; this function never
/// reorders. A run where nothing enriched still yields a well-formed
/// snapshot with zero counts.
pub fn assemble(
    markets: Vec<Market>,
    token_count: usize,
    started_at: DateTime<Utc>,
) -> Snapshot {
    let timestamp = Utc::now();
    info!(
        markets = markets.len(),
        tokens = token_count,
        elapsed_ms = (timestamp - started_at).num_milliseconds(),
        "snapshot assembled"
    );
    Snapshot {
        timestamp,
        market_count: markets.len(),
        token_count,
        markets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketKind, Side, TokenRef, TokenSlot};

    fn market(id: &str) -> Market {
        Market {
            id: id.to_string(),
            title: id.to_string(),
            kind: MarketKind::Binary,
            volume_24h: None,
            decimal_precision: 2,
            tokens: vec![TokenSlot::new(TokenRef::new("1", Side::Yes))],
            children: Vec::new(),
        }
    }

    #[test]
    fn counts_and_order_are_preserved() {
        let markets = vec![market("b"), market("a"), market("c")];
        let snapshot = assemble(markets, 3, Utc::now());

        assert_eq!(snapshot.market_count, 3);
        assert_eq!(snapshot.token_count, 3);
        let ids: Vec<&str> = snapshot.markets.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_run_is_still_well_formed() {
        let snapshot = assemble(Vec::new(), 0, Utc::now());
        assert_eq!(snapshot.market_count, 0);
        assert_eq!(snapshot.token_count, 0);
        assert!(snapshot.markets.is_empty());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["market_count"], 0);
        assert!(json["timestamp"].is_string());
    }
}
