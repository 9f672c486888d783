//! Pagination walker: drives a source's listing endpoint to enumerate the
//! full market set.
//!
//! A failure on the first page is fatal; a failure after at least one
//! successful page degrades to a partial result. The distinction is carried
//! by an explicit flag, never inferred from an empty accumulator.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::sources::MarketSource;
use crate::types::Market;

#[derive(Debug)]
pub enum ScanError {
    FatalListing {
        source: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FatalListing { source, reason } => {
                write!(f, "{source}: first listing page failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Walk the listing until the source reports no next page, a page comes
/// back empty, a page fails, or the page ceiling is hit.
pub async fn fetch_all<S: MarketSource>(source: &S) -> Result<Vec<Market>, ScanError> {
    let pacing = source.pacing().clone();
    let mut markets: Vec<Market> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut first_page_ok = false;
    let mut pages = 0usize;

    loop {
        if pages >= pacing.max_pages {
            warn!(
                source = source.name(),
                max_pages = pacing.max_pages,
                "page ceiling reached, stopping listing walk"
            );
            break;
        }

        let page = match source.fetch_page(page_token.take()).await {
            Ok(page) => page,
            Err(e) if first_page_ok => {
                warn!(
                    source = source.name(),
                    error = %e,
                    accumulated = markets.len(),
                    "listing page failed, keeping partial results"
                );
                break;
            }
            Err(e) => {
                return Err(ScanError::FatalListing {
                    source: source.name(),
                    reason: e.to_string(),
                });
            }
        };
        first_page_ok = true;
        pages += 1;

        if page.markets.is_empty() {
            debug!(source = source.name(), page = pages, "empty listing page, done");
            break;
        }

        info!(
            source = source.name(),
            page = pages,
            fetched = page.markets.len(),
            total = markets.len() + page.markets.len(),
            "listing page fetched"
        );
        markets.extend(page.markets);

        match page.next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }

        sleep(pacing.page_delay).await;
    }

    Ok(markets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchError;
    use crate::config::Pacing;
    use crate::sources::{ListingPage, TokenDetail};
    use crate::types::{MarketKind, Side, TokenRef, TokenSlot};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_pacing(max_pages: usize) -> Pacing {
        Pacing {
            concurrency_limit: 4,
            batch_size: 10,
            page_size: 2,
            max_pages,
            page_delay: Duration::ZERO,
            batch_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }

    fn market(id: &str) -> Market {
        Market {
            id: id.to_string(),
            title: id.to_string(),
            kind: MarketKind::Binary,
            volume_24h: None,
            decimal_precision: 2,
            tokens: vec![TokenSlot::new(TokenRef::new(id, Side::Yes))],
            children: Vec::new(),
        }
    }

    /// Replays a scripted sequence of listing pages.
    struct ScriptedSource {
        pacing: Pacing,
        pages: Mutex<VecDeque<Result<ListingPage, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<ListingPage, FetchError>>, max_pages: usize) -> Self {
            Self {
                pacing: test_pacing(max_pages),
                pages: Mutex::new(pages.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl MarketSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn pacing(&self) -> &Pacing {
            &self.pacing
        }

        async fn fetch_page(
            &self,
            _page_token: Option<String>,
        ) -> Result<ListingPage, FetchError> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
        }

        async fn fetch_detail(&self, _token: &TokenRef) -> Result<TokenDetail, FetchError> {
            Err(FetchError::Transport("not used".to_string()))
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<ListingPage, FetchError> {
        Ok(ListingPage {
            markets: ids.iter().map(|id| market(id)).collect(),
            next_token: next.map(String::from),
        })
    }

    #[tokio::test]
    async fn walks_until_listing_exhausted() {
        let source = ScriptedSource::new(
            vec![page(&["a", "b"], Some("2")), page(&["c"], None)],
            10,
        );
        let markets = fetch_all(&source).await.unwrap();
        let ids: Vec<&str> = markets.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failure_after_first_page_is_partial_success() {
        let source = ScriptedSource::new(
            vec![
                page(&["a", "b"], Some("2")),
                Err(FetchError::Server { status: 500 }),
            ],
            10,
        );
        let markets = fetch_all(&source).await.unwrap();
        let ids: Vec<&str> = markets.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn first_page_failure_is_fatal() {
        let source = ScriptedSource::new(
            vec![Err(FetchError::Transport("connection refused".to_string()))],
            10,
        );
        let err = fetch_all(&source).await.unwrap_err();
        assert!(matches!(err, ScanError::FatalListing { source: "scripted", .. }));
    }

    #[tokio::test]
    async fn stops_at_page_ceiling() {
        let source = ScriptedSource::new(
            vec![
                page(&["a"], Some("2")),
                page(&["b"], Some("3")),
                page(&["c"], Some("4")),
                page(&["d"], Some("5")),
            ],
            3,
        );
        let markets = fetch_all(&source).await.unwrap();
        assert_eq!(markets.len(), 3);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let source = ScriptedSource::new(vec![page(&["a"], Some("2")), page(&[], Some("3"))], 10);
        let markets = fetch_all(&source).await.unwrap();
        assert_eq!(markets.len(), 1);
    }
}
