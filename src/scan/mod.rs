//! The scan pipeline: listing walk, bounded enrichment, snapshot assembly.

mod enricher;
mod prices;
mod snapshot;
mod walker;

pub use enricher::{enrich, EnrichStats};
pub use prices::{best_ask, best_bid, complement, resolve};
pub use snapshot::assemble;
pub use walker::{fetch_all, ScanError};

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::info;

use crate::sources::MarketSource;
use crate::types::Snapshot;

/// Run the full pipeline against one source.
///
/// Only a fatal first-page listing failure surfaces as an error; every
/// per-item enrichment failure is absorbed into the owning slot.
pub async fn run_scan<S: MarketSource>(
    source: &S,
    run_timeout: Option<Duration>,
) -> Result<Snapshot, ScanError> {
    let started_at = Utc::now();
    let deadline = run_timeout.map(|timeout| Instant::now() + timeout);

    let mut markets = walker::fetch_all(source).await?;
    info!(
        source = source.name(),
        markets = markets.len(),
        "listing walk complete"
    );

    let stats = enricher::enrich(source, &mut markets, deadline).await;
    info!(
        source = source.name(),
        dispatched = stats.dispatched,
        failed = stats.failed,
        skipped_absent = stats.skipped_absent,
        "enrichment complete"
    );

    Ok(snapshot::assemble(markets, stats.dispatched, started_at))
}
