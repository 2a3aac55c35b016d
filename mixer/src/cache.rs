//! Lazily rebuilt view of the live sources in a weight table.
//!
//! The cache is a small state machine:
//!
//! ```text
//!            invalidate                begin_rebuild
//!   Fresh ─────────────────▶ Dirty ─────────────────▶ Rebuilding
//!     ▲                                                   │
//!     └──────────────── RebuildGuard dropped ─────────────┘
//! ```
//!
//! A rebuild request while `Fresh` or `Rebuilding` is refused, which is what
//! makes [`MixingCamera::refresh_cache`](crate::MixingCamera::refresh_cache)
//! safe to call from inside a collaborator it is itself calling.

use std::cell::{Cell, Ref, RefCell};

use crate::source::SourceHandle;
use crate::state::BlendState;
use crate::weights::WeightTable;

/// Freshness of a [`LiveCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Mirrors the weight table.
    Fresh,
    /// Must be rebuilt before the next use.
    Dirty,
    /// A rebuild is in progress; further rebuild requests are refused.
    Rebuilding,
}

/// Ordered handles of the sources whose weight rows are still valid.
pub struct LiveCache<S: BlendState> {
    state: Cell<CacheState>,
    sources: RefCell<Vec<SourceHandle<S>>>,
    generation: Cell<u64>,
}

impl<S: BlendState> LiveCache<S> {
    /// Creates an empty cache that needs a rebuild.
    pub fn new() -> Self {
        Self {
            state: Cell::new(CacheState::Dirty),
            sources: RefCell::new(Vec::new()),
            generation: Cell::new(0),
        }
    }

    /// Current freshness.
    pub fn state(&self) -> CacheState {
        self.state.get()
    }

    /// Number of completed rebuilds.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.sources.borrow().len()
    }

    /// Whether no handles are cached.
    pub fn is_empty(&self) -> bool {
        self.sources.borrow().is_empty()
    }

    /// Cached handle at `index`.
    pub fn get(&self, index: usize) -> Option<SourceHandle<S>> {
        self.sources.borrow().get(index).cloned()
    }

    /// Borrow of the cached handles.
    pub fn sources(&self) -> Ref<'_, Vec<SourceHandle<S>>> {
        self.sources.borrow()
    }

    /// Drops the cached handles and requires a rebuild.
    ///
    /// While a rebuild is in progress the state is left alone: the rebuild
    /// reads the table after its only call-out, so it already sees the
    /// change that caused this invalidation.
    pub fn invalidate(&self) {
        self.sources.borrow_mut().clear();
        if self.state.get() != CacheState::Rebuilding {
            self.state.set(CacheState::Dirty);
        }
    }

    /// Marks the cache as needing a rebuild without clearing it, e.g. when a
    /// cached source turns out to be dead mid-frame.
    pub(crate) fn mark_dirty(&self) {
        if self.state.get() == CacheState::Fresh {
            self.state.set(CacheState::Dirty);
        }
    }

    /// Marks a fresh cache dirty if any cached source has been dropped since
    /// the last rebuild.
    pub(crate) fn mark_dirty_if_stale(&self) {
        if self.state.get() == CacheState::Fresh
            && self.sources.borrow().iter().any(|handle| !handle.is_valid())
        {
            self.state.set(CacheState::Dirty);
        }
    }

    /// Enters `Rebuilding` if the cache is `Dirty`.
    ///
    /// Returns `None` when the cache is fresh or already being rebuilt.
    pub fn begin_rebuild(&self) -> Option<RebuildGuard<'_, S>> {
        match self.state.get() {
            CacheState::Dirty => {
                self.state.set(CacheState::Rebuilding);
                Some(RebuildGuard { cache: self })
            }
            CacheState::Fresh | CacheState::Rebuilding => None,
        }
    }
}

impl<S: BlendState> Default for LiveCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to rebuild a [`LiveCache`]. Dropping it marks the cache
/// `Fresh`, also when the rebuild unwinds.
pub struct RebuildGuard<'a, S: BlendState> {
    cache: &'a LiveCache<S>,
}

impl<S: BlendState> RebuildGuard<'_, S> {
    /// Prunes dead rows from `table` and refills the cache with the
    /// remaining sources in table order.
    ///
    /// Returns the number of pruned rows.
    pub fn rebuild_from(&self, table: &mut WeightTable<S>) -> usize {
        mixcam_core::profile_scope!("rebuild_live_cache");

        let pruned = table.prune_invalid();
        let mut sources = self.cache.sources.borrow_mut();
        sources.clear();
        sources.extend(table.iter().map(|entry| entry.source().clone()));
        self.cache.generation.set(self.cache.generation.get() + 1);
        pruned
    }
}

impl<S: BlendState> Drop for RebuildGuard<'_, S> {
    fn drop(&mut self) {
        self.cache.state.set(CacheState::Fresh);
    }
}
