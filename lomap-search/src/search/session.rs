//! Current map search state and overlapping-submission handling
//!
//! Every submission takes a [`SearchTicket`] stamped with a monotonic
//! sequence number. When its interpretation resolves, the criteria are only
//! applied if no newer submission has been applied already; late responses
//! from older submissions are dropped as stale. Until then the previously
//! applied criteria stay in place, so the visible result set never shows a
//! partial update.
//!
//! Sessions belong to one client each; [`SessionRegistry`] hands them out by
//! a client-chosen id so that unrelated callers never overtake each other.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::criteria::FilterCriteria;

#[derive(Debug)]
struct Applied {
    criteria: FilterCriteria,
    sequence: u64,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub criteria: FilterCriteria,
    /// At least one submission is still waiting on its interpretation
    pub searching: bool,
    /// Sequence number of the submission that produced `criteria` (0 = initial)
    pub sequence: u64,
}

/// Shared search state for the map view
#[derive(Debug)]
pub struct SearchSession {
    next_sequence: AtomicU64,
    in_flight: AtomicUsize,
    applied: RwLock<Applied>,
}

impl SearchSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_sequence: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            applied: RwLock::new(Applied {
                criteria: FilterCriteria::match_all(),
                sequence: 0,
            }),
        })
    }

    /// Register a new submission
    pub fn begin(self: &Arc<Self>) -> SearchTicket {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        SearchTicket {
            session: Arc::clone(self),
            sequence,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let applied = self.applied.read().await;
        SessionSnapshot {
            criteria: applied.criteria.clone(),
            searching: self.in_flight.load(Ordering::SeqCst) > 0,
            sequence: applied.sequence,
        }
    }

    pub async fn current_criteria(&self) -> FilterCriteria {
        self.applied.read().await.criteria.clone()
    }
}

/// Outstanding submission; dropping it without completing just releases it
#[derive(Debug)]
pub struct SearchTicket {
    session: Arc<SearchSession>,
    sequence: u64,
}

impl SearchTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Apply `criteria` unless a newer submission already landed
    ///
    /// Returns `true` when applied, `false` when discarded as stale.
    pub async fn complete(self, criteria: FilterCriteria) -> bool {
        let mut applied = self.session.applied.write().await;
        if self.sequence > applied.sequence {
            applied.criteria = criteria;
            applied.sequence = self.sequence;
            true
        } else {
            debug!(
                sequence = self.sequence,
                applied = applied.sequence,
                "Discarding stale search response"
            );
            false
        }
    }
}

impl Drop for SearchTicket {
    fn drop(&mut self) {
        self.session.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Session id used when a client does not send one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Longest accepted client session id
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Sessions kept before the least recently used one is evicted
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

struct RegistryEntry {
    session: Arc<SearchSession>,
    /// Registry tick of the last lookup
    last_used: u64,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, RegistryEntry>,
    tick: u64,
}

/// Search sessions keyed by client session id
pub struct SessionRegistry {
    inner: Mutex<Registry>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            capacity: capacity.max(1),
        }
    }

    /// Session for `id`, created on first use
    pub async fn session(&self, id: &str) -> Arc<SearchSession> {
        let mut registry = self.inner.lock().await;
        registry.tick += 1;
        let tick = registry.tick;

        if let Some(entry) = registry.entries.get_mut(id) {
            entry.last_used = tick;
            return Arc::clone(&entry.session);
        }

        if registry.entries.len() >= self.capacity {
            let oldest = registry
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                registry.entries.remove(&key);
                debug!(session = %key, "Evicted least recently used search session");
            }
        }

        let session = SearchSession::new();
        registry.entries.insert(
            id.to_string(),
            RegistryEntry {
                session: Arc::clone(&session),
                last_used: tick,
            },
        );
        session
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_matches_everything() {
        let session = SearchSession::new();
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.criteria, FilterCriteria::match_all());
        assert!(!snapshot.searching);
        assert_eq!(snapshot.sequence, 0);
    }

    #[tokio::test]
    async fn test_searching_keeps_previous_criteria() {
        let session = SearchSession::new();
        session.begin().complete(FilterCriteria::keyword_only("mật ong")).await;

        let pending = session.begin();
        let snapshot = session.snapshot().await;
        assert!(snapshot.searching);
        assert_eq!(snapshot.criteria.keyword, "mật ong");

        assert!(pending.complete(FilterCriteria::keyword_only("vải")).await);
        let snapshot = session.snapshot().await;
        assert!(!snapshot.searching);
        assert_eq!(snapshot.criteria.keyword, "vải");
    }

    #[tokio::test]
    async fn test_late_response_from_older_search_is_discarded() {
        let session = SearchSession::new();
        let first = session.begin();
        let second = session.begin();
        assert!(second.sequence() > first.sequence());

        assert!(second.complete(FilterCriteria::keyword_only("newer")).await);
        assert!(!first.complete(FilterCriteria::keyword_only("older")).await);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.criteria.keyword, "newer");
        assert_eq!(snapshot.sequence, 2);
        assert!(!snapshot.searching);
    }

    #[tokio::test]
    async fn test_in_order_responses_all_apply() {
        let session = SearchSession::new();
        let first = session.begin();
        let second = session.begin();

        assert!(first.complete(FilterCriteria::keyword_only("older")).await);
        assert!(second.complete(FilterCriteria::keyword_only("newer")).await);
        assert_eq!(session.current_criteria().await.keyword, "newer");
    }

    #[tokio::test]
    async fn test_dropped_ticket_releases_searching_state() {
        let session = SearchSession::new();
        let ticket = session.begin();
        assert!(session.snapshot().await.searching);

        drop(ticket);
        let snapshot = session.snapshot().await;
        assert!(!snapshot.searching);
        assert_eq!(snapshot.criteria, FilterCriteria::match_all());
    }

    #[tokio::test]
    async fn test_registry_isolates_clients() {
        let registry = SessionRegistry::new();
        let alice = registry.session("alice").await;
        let bob = registry.session("bob").await;

        let slow = alice.begin();
        assert!(bob.begin().complete(FilterCriteria::keyword_only("thổ cẩm")).await);

        // Bob's newer search does not make Alice's older one stale
        assert!(slow.complete(FilterCriteria::keyword_only("mật ong")).await);
        assert_eq!(alice.current_criteria().await.keyword, "mật ong");
        assert_eq!(bob.current_criteria().await.keyword, "thổ cẩm");
    }

    #[tokio::test]
    async fn test_registry_returns_same_session_for_same_id() {
        let registry = SessionRegistry::new();
        let first = registry.session("alice").await;
        let again = registry.session("alice").await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_registry_evicts_least_recently_used() {
        let registry = SessionRegistry::with_capacity(2);
        let a = registry.session("a").await;
        registry.session("b").await;
        // Touch "a" so "b" becomes the oldest
        registry.session("a").await;
        registry.session("c").await;

        assert_eq!(registry.len().await, 2);
        assert!(Arc::ptr_eq(&a, &registry.session("a").await));
        assert_eq!(registry.len().await, 2);
    }
}
