use std::sync::Arc;

use crate::cache::ListingCache;
use crate::fetcher::ListingSource;
use crate::listing::{ListingKey, ListingPage, PostId};
use crate::logger::{LogSink, Severity};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no cached listing for {0}")]
    CacheMiss(ListingKey),
    #[error("listing {0} unavailable: fetch failed and nothing cached")]
    NeighborUnresolvable(ListingKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Older post, further down the listing.
    Previous,
    /// Newer post, further up the listing.
    Next,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Previous => "prev",
            Direction::Next => "next",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborResult {
    pub direction: Direction,
    pub post: PostId,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Neighbors {
    pub previous: Option<NeighborResult>,
    pub next: Option<NeighborResult>,
    /// Listings that could neither be fetched nor found in the cache.
    pub unresolved: Vec<ListingKey>,
}

impl Neighbors {
    /// The current page itself could not be retrieved.
    pub fn is_degraded(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborResult> {
        self.next.iter().chain(self.previous.iter())
    }
}

/// Position of the neighbors of `index` within one page, newest first.
/// `None` means the neighbor is not on this page.
pub fn neighbor_indices(len: usize, index: Option<usize>) -> (Option<usize>, Option<usize>) {
    match index {
        Some(i) if i < len => {
            let previous = (i + 1 < len).then_some(i + 1);
            let next = i.checked_sub(1);
            (previous, next)
        }
        _ => (None, None),
    }
}

pub struct Resolver {
    source: Arc<dyn ListingSource>,
    cache: ListingCache,
    sink: Arc<dyn LogSink>,
}

impl Resolver {
    pub fn new(source: Arc<dyn ListingSource>, cache: ListingCache, sink: Arc<dyn LogSink>) -> Self {
        Self {
            source,
            cache,
            sink,
        }
    }

    /// Network first, then the session cache. An empty listing is a valid
    /// result, not a failure.
    pub fn retrieve(&self, key: &ListingKey) -> Result<ListingPage, ResolveError> {
        let err = match self.source.fetch(key) {
            Ok(page) => return Ok(page),
            Err(err) => err,
        };
        self.sink.emit("retrieve", Severity::Warn, &err.to_string());

        match self.cached(key) {
            Ok(page) => {
                self.sink.emit(
                    "retrieve",
                    Severity::Fallback,
                    &format!("using cached data for page: {}", key.page),
                );
                Ok(page)
            }
            Err(_) => {
                self.sink.emit(
                    "retrieve",
                    Severity::Fail,
                    &format!("no cache available for page: {}", key.page),
                );
                Err(ResolveError::NeighborUnresolvable(key.clone()))
            }
        }
    }

    fn cached(&self, key: &ListingKey) -> Result<ListingPage, ResolveError> {
        self.cache
            .get(key)
            .ok_or_else(|| ResolveError::CacheMiss(key.clone()))
    }

    pub fn resolve(&self, current: &ListingKey, post: &PostId) -> Neighbors {
        self.sink.emit(
            "resolve",
            Severity::Info,
            &format!(
                "mode: {:?}, category: {}, page: {}, post: {post}",
                current.mode,
                current.category.as_deref().unwrap_or("none"),
                current.page
            ),
        );

        let mut neighbors = Neighbors::default();
        let page = match self.retrieve(current) {
            Ok(page) => page,
            Err(_) => {
                neighbors.unresolved.push(current.clone());
                return neighbors;
            }
        };

        let (previous_idx, next_idx) = neighbor_indices(page.len(), page.position(post));

        neighbors.previous = match previous_idx.and_then(|i| page.get(i)) {
            Some(id) => Some(NeighborResult {
                direction: Direction::Previous,
                post: id.clone(),
                page: current.page,
            }),
            // No page lies beyond u32::MAX, so there is nothing older.
            None => current.page.checked_add(1).and_then(|older| {
                self.adjacent(
                    &current.with_page(older),
                    Direction::Previous,
                    &mut neighbors.unresolved,
                )
            }),
        };

        neighbors.next = match next_idx.and_then(|i| page.get(i)) {
            Some(id) => Some(NeighborResult {
                direction: Direction::Next,
                post: id.clone(),
                page: current.page,
            }),
            None if current.page > 1 => {
                let newer = current.with_page(current.page - 1);
                self.adjacent(&newer, Direction::Next, &mut neighbors.unresolved)
            }
            None => None,
        };

        neighbors
    }

    /// Previous takes the first post of the older page, next the last post
    /// of the newer one.
    fn adjacent(
        &self,
        key: &ListingKey,
        direction: Direction,
        unresolved: &mut Vec<ListingKey>,
    ) -> Option<NeighborResult> {
        let page = match self.retrieve(key) {
            Ok(page) => page,
            Err(_) => {
                unresolved.push(key.clone());
                return None;
            }
        };
        let post = match direction {
            Direction::Previous => page.first(),
            Direction::Next => page.last(),
        }?;
        Some(NeighborResult {
            direction,
            post: post.clone(),
            page: key.page,
        })
    }
}
