//! Concurrency-bounded enrichment of discovered markets.
//!
//! Dispatchable token references are drained in fixed-size batches; inside a
//! batch each item holds one admission slot on a counting semaphore sized to
//! the source's concurrency limit. Per-item failures are recorded on the
//! owning slot and never abort sibling work. Results are written back by
//! slot key, so market order stays listing order no matter which fetches
//! finish first.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::prices;
use crate::sources::MarketSource;
use crate::types::{Market, TokenRef, TokenSlot};

/// Addresses one token slot inside the market list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotKey {
    market: usize,
    child: Option<usize>,
    slot: usize,
}

#[derive(Debug, Default, Clone)]
pub struct EnrichStats {
    /// Work items actually sent to the detail endpoint.
    pub dispatched: usize,
    /// Dispatched items whose detail fetch failed after retries.
    pub failed: usize,
    /// Token references with sentinel ids, never dispatched.
    pub skipped_absent: usize,
}

/// Fetch detail data for every non-absent token reference in `markets`,
/// mutating slots in place. The `deadline` is checked after every admission
/// slot is acquired: once it passes, no further item is dispatched, while
/// already in-flight work runs to completion.
pub async fn enrich<S: MarketSource>(
    source: &S,
    markets: &mut [Market],
    deadline: Option<Instant>,
) -> EnrichStats {
    let pacing = source.pacing().clone();
    let mut stats = EnrichStats::default();

    // Absent references are filtered here, before any dispatch.
    let mut work: Vec<(SlotKey, TokenRef, u32)> = Vec::new();
    for (market_idx, market) in markets.iter().enumerate() {
        for (slot_idx, slot) in market.tokens.iter().enumerate() {
            collect_slot(
                SlotKey {
                    market: market_idx,
                    child: None,
                    slot: slot_idx,
                },
                slot,
                market.decimal_precision,
                &mut work,
                &mut stats,
            );
        }
        for (child_idx, child) in market.children.iter().enumerate() {
            for (slot_idx, slot) in child.tokens.iter().enumerate() {
                collect_slot(
                    SlotKey {
                        market: market_idx,
                        child: Some(child_idx),
                        slot: slot_idx,
                    },
                    slot,
                    child.decimal_precision,
                    &mut work,
                    &mut stats,
                );
            }
        }
    }

    let semaphore = Arc::new(Semaphore::new(pacing.concurrency_limit));
    let settle_delay = pacing.settle_delay;
    let total = work.len();

    for batch in work.chunks(pacing.batch_size) {
        if expired(deadline) {
            break;
        }

        let futures = batch.iter().map(|(key, token, precision)| {
            let semaphore = Arc::clone(&semaphore);
            let key = *key;
            let token = token.clone();
            let precision = *precision;
            async move {
                // The semaphore is never closed, acquire cannot fail.
                let permit = semaphore.acquire().await.unwrap();
                // Re-check after admission: items that waited out the
                // deadline on the semaphore are not dispatched.
                if expired(deadline) {
                    return (key, precision, None);
                }
                let result = source.fetch_detail(&token).await;
                // Hold the slot briefly so releases do not burst in lockstep.
                sleep(settle_delay).await;
                drop(permit);
                (key, precision, Some(result))
            }
        });

        for (key, precision, outcome) in join_all(futures).await {
            let Some(result) = outcome else { continue };
            stats.dispatched += 1;
            let slot = slot_mut(markets, key);
            match result {
                Ok(detail) => {
                    slot.prices = detail.book.as_ref().map(|book| prices::resolve(book, precision));
                    slot.book = detail.book;
                    slot.stats = detail.stats;
                }
                Err(e) => {
                    stats.failed += 1;
                    debug!(
                        token = %slot.token.id,
                        error = %e,
                        "detail fetch failed, leaving slot empty"
                    );
                    slot.error = Some(e.to_string());
                }
            }
        }

        sleep(pacing.batch_delay).await;
    }

    let remaining = total - stats.dispatched;
    if remaining > 0 {
        warn!(
            source = source.name(),
            remaining,
            "run deadline reached before all work was dispatched"
        );
    }

    stats
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn collect_slot(
    key: SlotKey,
    slot: &TokenSlot,
    precision: u32,
    work: &mut Vec<(SlotKey, TokenRef, u32)>,
    stats: &mut EnrichStats,
) {
    if slot.token.is_absent() {
        stats.skipped_absent += 1;
        return;
    }
    work.push((key, slot.token.clone(), precision));
}

fn slot_mut(markets: &mut [Market], key: SlotKey) -> &mut TokenSlot {
    let market = &mut markets[key.market];
    match key.child {
        None => &mut market.tokens[key.slot],
        Some(child) => &mut market.children[child].tokens[key.slot],
    }
}
