//! Browse Session
//!
//! A session holds the most recently enriched listing window for one
//! consumer. Starting a load for a different window supersedes any load
//! still in flight: the older task is aborted and its result, if it still
//! arrives, is never published. A load for the window already in flight
//! joins that batch instead of restarting it.
//!
//! Sessions are keyed per consumer in a [`SessionRegistry`], so requests
//! from different consumers never supersede each other.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::enricher::Enricher;
use crate::chain::ListingSource;
use crate::error::MarketError;
use crate::models::EnrichedListing;

/// Offset/limit window over the marketplace's active listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingWindow {
    pub offset: u64,
    pub limit: u64,
}

/// A published batch.
#[derive(Debug, Clone)]
pub struct LoadedWindow {
    pub window: ListingWindow,
    pub generation: u64,
    pub items: Arc<Vec<EnrichedListing>>,
}

#[derive(Clone)]
enum BatchOutcome {
    Loaded(Arc<Vec<EnrichedListing>>),
    Failed(MarketError),
    Cancelled,
}

struct InFlight {
    window: ListingWindow,
    generation: u64,
    abort: AbortHandle,
    outcome: Shared<BoxFuture<'static, BatchOutcome>>,
}

pub struct BrowseSession {
    source: Arc<dyn ListingSource>,
    enricher: Enricher,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    current: RwLock<Option<LoadedWindow>>,
}

impl BrowseSession {
    pub fn new(source: Arc<dyn ListingSource>, enricher: Enricher) -> Self {
        Self {
            source,
            enricher,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            current: RwLock::new(None),
        }
    }

    /// Load and enrich `window`. Returns `Ok(None)` when a load for another
    /// window superseded this one before it finished.
    pub async fn load(&self, window: ListingWindow) -> Result<Option<Arc<Vec<EnrichedListing>>>, MarketError> {
        let (generation, outcome) = {
            let mut in_flight = self.in_flight.lock().await;
            let joined = in_flight
                .as_ref()
                .filter(|running| running.window == window)
                .map(|running| (running.generation, running.outcome.clone()));

            match joined {
                Some((generation, outcome)) => {
                    debug!("Joining in-flight batch generation {} for {:?}", generation, window);
                    (generation, outcome)
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let (abort, outcome) = self.spawn_batch(window);

                    let next = InFlight {
                        window,
                        generation,
                        abort,
                        outcome: outcome.clone(),
                    };
                    if let Some(previous) = in_flight.replace(next) {
                        debug!(
                            "Superseding batch generation {} with generation {}",
                            previous.generation, generation
                        );
                        previous.abort.abort();
                    }
                    (generation, outcome)
                }
            }
        };

        let outcome = outcome.await;

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.as_ref().map(|running| running.generation) == Some(generation) {
                *in_flight = None;
            }
        }

        let items = match outcome {
            BatchOutcome::Loaded(items) => items,
            BatchOutcome::Failed(e) => {
                if self.is_stale(generation) {
                    return Ok(None);
                }
                error!("Failed to load listings {:?}: {}", window, e);
                return Err(e);
            }
            BatchOutcome::Cancelled => {
                debug!("Batch generation {} cancelled", generation);
                return Ok(None);
            }
        };

        let mut current = self.current.write().await;
        if self.is_stale(generation) {
            debug!("Discarding stale batch generation {} for {:?}", generation, window);
            return Ok(None);
        }

        if current.as_ref().map(|loaded| loaded.generation) != Some(generation) {
            info!(
                "Loaded {} enriched listings (offset {}, limit {})",
                items.len(),
                window.offset,
                window.limit
            );
            *current = Some(LoadedWindow {
                window,
                generation,
                items: items.clone(),
            });
        }
        Ok(Some(items))
    }

    /// The last published window, if any load has completed.
    pub async fn current(&self) -> Option<LoadedWindow> {
        self.current.read().await.clone()
    }

    fn spawn_batch(&self, window: ListingWindow) -> (AbortHandle, Shared<BoxFuture<'static, BatchOutcome>>) {
        let source = self.source.clone();
        let enricher = self.enricher.clone();
        let task = tokio::spawn(async move {
            let listings = source.active_listings(window.offset, window.limit).await?;
            Ok::<_, MarketError>(enricher.enrich(listings).await)
        });

        let abort = task.abort_handle();
        let outcome = task
            .map(|joined| match joined {
                Ok(Ok(items)) => BatchOutcome::Loaded(Arc::new(items)),
                Ok(Err(e)) => BatchOutcome::Failed(e),
                Err(e) if e.is_cancelled() => BatchOutcome::Cancelled,
                Err(e) => BatchOutcome::Failed(MarketError::ChainRead(format!("listing load aborted: {}", e))),
            })
            .boxed()
            .shared();
        (abort, outcome)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

/// Browse sessions keyed by consumer.
pub struct SessionRegistry {
    source: Arc<dyn ListingSource>,
    enricher: Enricher,
    sessions: RwLock<HashMap<String, Arc<BrowseSession>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(source: Arc<dyn ListingSource>, enricher: Enricher, max_sessions: usize) -> Self {
        Self {
            source,
            enricher,
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Session for `key`, created on first use. Requests without a key, or
    /// arriving once the registry is full, get a session of their own that
    /// is not retained.
    pub async fn session_for(&self, key: Option<&str>) -> Arc<BrowseSession> {
        let key = match key {
            Some(key) if !key.is_empty() => key,
            _ => return self.detached(),
        };

        if let Some(session) = self.sessions.read().await.get(key) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(key) {
            return session.clone();
        }

        if sessions.len() >= self.max_sessions {
            warn!(
                "Session limit ({}) reached, serving {} without a retained session",
                self.max_sessions, key
            );
            return self.detached();
        }

        let session = self.detached();
        sessions.insert(key.to_string(), session.clone());
        debug!("Created browse session {} ({} total)", key, sessions.len());
        session
    }

    pub async fn get(&self, key: &str) -> Option<Arc<BrowseSession>> {
        self.sessions.read().await.get(key).cloned()
    }

    fn detached(&self) -> Arc<BrowseSession> {
        Arc::new(BrowseSession::new(self.source.clone(), self.enricher.clone()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::marketplace::enricher::tests::{enricher, listing, metadata_server, MockChain};
    use crate::models::Listing;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Listing source returning `limit` listings numbered from `offset`.
    #[derive(Default)]
    pub(crate) struct MockSource {
        pub delays: HashMap<u64, Duration>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for MockSource {
        async fn active_listings(&self, offset: u64, limit: u64) -> Result<Vec<Listing>, MarketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&offset) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail {
                return Err(MarketError::ChainRead("getActiveListings reverted".to_string()));
            }
            Ok((offset..offset + limit)
                .map(|id| listing(id, id * 10, 1_000 + id))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_load_publishes_window() {
        let server = metadata_server().await;
        let chain = Arc::new(MockChain::new(&server.url()));
        let session = BrowseSession::new(
            Arc::new(MockSource::default()),
            enricher(chain, Duration::from_secs(5)),
        );

        let window = ListingWindow { offset: 0, limit: 3 };
        let items = session.load(window).await.unwrap().unwrap();

        assert_eq!(items.len(), 3);
        let current = session.current().await.unwrap();
        assert_eq!(current.window, window);
        assert_eq!(current.items.len(), 3);
    }

    #[tokio::test]
    async fn test_newer_load_supersedes_older() {
        let server = metadata_server().await;
        let chain = Arc::new(MockChain::new(&server.url()));
        let mut source = MockSource::default();
        source.delays.insert(0, Duration::from_millis(300));
        let session = Arc::new(BrowseSession::new(
            Arc::new(source),
            enricher(chain, Duration::from_secs(5)),
        ));

        let stale = {
            let session = session.clone();
            tokio::spawn(async move { session.load(ListingWindow { offset: 0, limit: 2 }).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fresh = session
            .load(ListingWindow { offset: 20, limit: 2 })
            .await
            .unwrap();

        assert!(fresh.is_some());
        assert!(stale.await.unwrap().unwrap().is_none());

        let current = session.current().await.unwrap();
        assert_eq!(current.window.offset, 20);
        assert_eq!(current.items[0].listing.token_id.as_u64(), 20);
    }

    #[tokio::test]
    async fn test_identical_window_joins_in_flight_batch() {
        let server = metadata_server().await;
        let chain = Arc::new(MockChain::new(&server.url()));
        let mut source = MockSource::default();
        source.delays.insert(0, Duration::from_millis(200));
        let source = Arc::new(source);
        let session = Arc::new(BrowseSession::new(
            source.clone(),
            enricher(chain, Duration::from_secs(5)),
        ));

        let window = ListingWindow { offset: 0, limit: 3 };
        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.load(window).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = session.load(window).await.unwrap().unwrap();
        let first = first.await.unwrap().unwrap().unwrap();

        assert_eq!(second.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.current().await.unwrap().window, window);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let chain = Arc::new(MockChain::new("http://127.0.0.1:1"));
        let source = MockSource {
            fail: true,
            ..Default::default()
        };
        let session = BrowseSession::new(Arc::new(source), enricher(chain, Duration::from_secs(1)));

        let result = session.load(ListingWindow { offset: 0, limit: 5 }).await;

        assert!(matches!(result, Err(MarketError::ChainRead(_))));
        assert!(session.current().await.is_none());
    }

    fn registry(max_sessions: usize) -> SessionRegistry {
        let chain = Arc::new(MockChain::new("http://127.0.0.1:1"));
        SessionRegistry::new(
            Arc::new(MockSource::default()),
            enricher(chain, Duration::from_secs(1)),
            max_sessions,
        )
    }

    #[tokio::test]
    async fn test_registry_reuses_keyed_sessions() {
        let registry = registry(4);

        let a = registry.session_for(Some("alice")).await;
        let again = registry.session_for(Some("alice")).await;
        let b = registry.session_for(Some("bob")).await;

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(registry.get("alice").await.is_some());
    }

    #[tokio::test]
    async fn test_registry_anonymous_sessions_are_not_retained() {
        let registry = registry(4);

        let first = registry.session_for(None).await;
        let second = registry.session_for(Some("")).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(registry.get("").await.is_none());
    }

    #[tokio::test]
    async fn test_registry_full_serves_detached_session() {
        let registry = registry(1);

        registry.session_for(Some("alice")).await;
        let overflow = registry.session_for(Some("bob")).await;

        assert!(registry.get("bob").await.is_none());
        assert!(!Arc::ptr_eq(&overflow, &registry.session_for(Some("bob")).await));
    }
}
