//! Weight assignment for camera sources.
//!
//! [`WeightTable`] is the single source of truth for how much each source
//! contributes to a mix. Rows keep insertion order; lookups by source go
//! through an identity map that is rebuilt after every structural change.

use std::collections::HashMap;

use crate::error::MixError;
use crate::source::{SourceHandle, SourceKey, SourceRef, source_key};
use crate::state::BlendState;

/// Clamps a weight to be finite and non-negative. NaN and infinities map
/// to zero.
#[inline]
pub fn clamp_weight(weight: f32) -> f32 {
    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}

/// A source and the weight assigned to it.
///
/// Two entries are equal when they reference the same source and carry the
/// same weight.
pub struct WeightEntry<S: BlendState> {
    source: SourceHandle<S>,
    weight: f32,
}

impl<S: BlendState> WeightEntry<S> {
    /// Creates an entry. The weight is stored as given until the entry is
    /// written into a table.
    pub fn new(source: &SourceRef<S>, weight: f32) -> Self {
        Self::from_handle(source.into(), weight)
    }

    /// Creates an entry from an existing handle.
    pub fn from_handle(source: SourceHandle<S>, weight: f32) -> Self {
        Self { source, weight }
    }

    /// Handle of the weighted source.
    pub fn source(&self) -> &SourceHandle<S> {
        &self.source
    }

    /// Assigned weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Same source, different weight.
    #[must_use]
    pub fn with_weight(&self, weight: f32) -> Self {
        Self::from_handle(self.source.clone(), weight)
    }
}

impl<S: BlendState> Clone for WeightEntry<S> {
    fn clone(&self) -> Self {
        Self::from_handle(self.source.clone(), self.weight)
    }
}

impl<S: BlendState> PartialEq for WeightEntry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.weight == other.weight
    }
}

impl<S: BlendState> std::fmt::Debug for WeightEntry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightEntry")
            .field("source", &self.source)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Ordered table of weighted sources.
pub struct WeightTable<S: BlendState> {
    entries: Vec<WeightEntry<S>>,
    /// Source identity to the position of its first row.
    index: HashMap<SourceKey, usize>,
}

impl<S: BlendState> WeightTable<S> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a table from raw entries, e.g. deserialized or edited data.
    ///
    /// Weights are kept as given; run [`validate`](Self::validate) to clamp
    /// them.
    pub fn from_entries(entries: Vec<WeightEntry<S>>) -> Self {
        let mut table = Self {
            entries,
            index: HashMap::new(),
        };
        table.reindex();
        table
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows in canonical order.
    pub fn entries(&self) -> &[WeightEntry<S>] {
        &self.entries
    }

    /// Iterates rows in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &WeightEntry<S>> {
        self.entries.iter()
    }

    /// Row at `index`.
    pub fn get(&self, index: usize) -> Option<&WeightEntry<S>> {
        self.entries.get(index)
    }

    /// Position of the first row for `source`.
    pub fn position_of(&self, source: &SourceRef<S>) -> Option<usize> {
        self.index.get(&source_key(source)).copied()
    }

    /// Whether `source` has a row, regardless of its weight.
    pub fn contains(&self, source: &SourceRef<S>) -> bool {
        self.position_of(source).is_some()
    }

    // ---------------------------------------------------------------------
    // Lookups by position
    // ---------------------------------------------------------------------

    /// Weight at `index`.
    pub fn try_weight(&self, index: usize) -> Result<f32, MixError> {
        self.entries
            .get(index)
            .map(WeightEntry::weight)
            .ok_or(MixError::InvalidIndex {
                index,
                len: self.entries.len(),
            })
    }

    /// Weight at `index`, or 0 (logged) when out of range.
    pub fn weight(&self, index: usize) -> f32 {
        self.try_weight(index).unwrap_or_else(|e| {
            log::error!("Weight table: {e}");
            0.0
        })
    }

    /// Replaces the row at `index` with the same source and `max(0, weight)`.
    pub fn try_set_weight(&mut self, index: usize, weight: f32) -> Result<(), MixError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(MixError::InvalidIndex { index, len })?;
        *entry = entry.with_weight(clamp_weight(weight));
        Ok(())
    }

    /// Sets the weight at `index`; out of range is logged and ignored.
    pub fn set_weight(&mut self, index: usize, weight: f32) {
        if let Err(e) = self.try_set_weight(index, weight) {
            log::error!("Weight table: {e}");
        }
    }

    // ---------------------------------------------------------------------
    // Lookups by source
    // ---------------------------------------------------------------------

    fn resolve(&self, source: &SourceRef<S>) -> Result<usize, MixError> {
        self.position_of(source)
            .ok_or_else(|| MixError::UnknownSource {
                name: source.name().to_owned(),
            })
    }

    /// Weight of `source`.
    pub fn try_weight_of(&self, source: &SourceRef<S>) -> Result<f32, MixError> {
        self.try_weight(self.resolve(source)?)
    }

    /// Weight of `source`, or 0 (logged) when it has no row.
    pub fn weight_of(&self, source: &SourceRef<S>) -> f32 {
        self.try_weight_of(source).unwrap_or_else(|e| {
            log::error!("Weight table: {e}");
            0.0
        })
    }

    /// Sets the weight of `source`.
    pub fn try_set_weight_of(
        &mut self,
        source: &SourceRef<S>,
        weight: f32,
    ) -> Result<(), MixError> {
        let index = self.resolve(source)?;
        self.try_set_weight(index, weight)
    }

    /// Sets the weight of `source`; an unknown source is logged and ignored.
    pub fn set_weight_of(&mut self, source: &SourceRef<S>, weight: f32) {
        if let Err(e) = self.try_set_weight_of(source, weight) {
            log::error!("Weight table: {e}");
        }
    }

    // ---------------------------------------------------------------------
    // Structural mutations
    // ---------------------------------------------------------------------

    /// Appends a row, clamping its weight.
    pub fn append(&mut self, entry: WeightEntry<S>) {
        let position = self.entries.len();
        self.index.entry(entry.source.key()).or_insert(position);
        let weight = clamp_weight(entry.weight);
        self.entries.push(WeightEntry::from_handle(entry.source, weight));
    }

    /// Removes the first row equal to `entry` (same source and weight).
    ///
    /// Returns `true` if a row was removed.
    pub fn remove(&mut self, entry: &WeightEntry<S>) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(position) => {
                self.entries.remove(position);
                self.reindex();
                true
            }
            None => false,
        }
    }

    /// Removes the first row for `source`. Returns `true` if a row was removed.
    pub fn remove_source(&mut self, source: &SourceRef<S>) -> bool {
        match self.position_of(source) {
            Some(position) => {
                self.entries.remove(position);
                self.reindex();
                true
            }
            None => false,
        }
    }

    /// Deletes every row whose source has been dropped.
    ///
    /// Returns the number of rows removed.
    pub(crate) fn prune_invalid(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.source.is_valid());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            self.reindex();
        }
        pruned
    }

    // ---------------------------------------------------------------------
    // Bulk passes
    // ---------------------------------------------------------------------

    /// Clamps every weight to be finite and non-negative.
    ///
    /// Returns the number of rows that changed. A stored `-0.0` is left
    /// alone.
    pub fn validate(&mut self) -> usize {
        let mut clamped = 0;
        for entry in &mut self.entries {
            let weight = clamp_weight(entry.weight);
            if weight != entry.weight {
                log::warn!(
                    "Weight {} for '{}' clamped to {weight}",
                    entry.weight,
                    entry.source.name()
                );
                *entry = entry.with_weight(weight);
                clamped += 1;
            }
        }
        clamped
    }

    /// Gives the first row weight 1 and every other row weight 0.
    pub fn reset(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            *entry = entry.with_weight(if i == 0 { 1.0 } else { 0.0 });
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            self.index.entry(entry.source.key()).or_insert(position);
        }
    }
}

impl<S: BlendState> Default for WeightTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BlendState> std::fmt::Debug for WeightTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
