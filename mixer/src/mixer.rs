//! The mixing camera: a weighted blend of child camera sources.

use std::cell::{Cell, RefCell};
use std::fmt;

use mixcam_core::math::Vec3;

use crate::cache::{CacheState, LiveCache};
use crate::error::MixError;
use crate::settings::MixerSettings;
use crate::source::{
    CameraSource, FinalizeHook, PipelineStage, SourceHandle, SourceProvider, SourceRef, source_key,
};
use crate::state::BlendState;
use crate::weights::{WeightEntry, WeightTable, clamp_weight};

/// Output of one [`MixingCamera::update`] tick.
pub struct BlendResult<S: BlendState> {
    /// The blended camera state.
    pub state: S,
    /// The qualifying source with the highest weight, if any.
    pub dominant: Option<SourceRef<S>>,
    /// Weight of the dominant source as a percentage of the total
    /// qualifying weight, in `[0, 100]`.
    pub dominance_percent: f32,
}

impl<S: BlendState + fmt::Debug> fmt::Debug for BlendResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlendResult")
            .field("state", &self.state)
            .field("dominant", &self.dominant.as_ref().map(|s| s.name().to_owned()))
            .field("dominance_percent", &self.dominance_percent)
            .finish()
    }
}

/// Blends the states of weighted child sources into one camera state.
///
/// The mixer is meant to be shared through an `Rc` and driven once per frame
/// by [`update`](Self::update). Every method takes `&self`, so collaborators
/// such as the [`SourceProvider`] may call back into the mixer while it is
/// working; the live cache refuses nested rebuilds.
///
/// A mixer is itself a [`CameraSource`] and can be a child of another
/// mixer. Its [`state`](CameraSource::state) is the output of the last
/// `update`, so nested mixers must be updated before their parents.
pub struct MixingCamera<S: BlendState + 'static> {
    name: String,
    settings: MixerSettings,
    enabled: Cell<bool>,
    table: RefCell<WeightTable<S>>,
    cache: LiveCache<S>,
    provider: Option<Box<dyn SourceProvider<S>>>,
    /// Children reported by the provider; `None` until a fetch succeeds.
    children: RefCell<Option<Vec<SourceHandle<S>>>>,
    state: RefCell<S>,
    live_child: RefCell<Option<SourceHandle<S>>>,
    live_child_percent: Cell<f32>,
    previous_state_valid: Cell<bool>,
    finalize_hooks: RefCell<Vec<FinalizeHook<S>>>,
}

impl<S: BlendState + Default + 'static> MixingCamera<S> {
    /// Creates an empty mixer with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, MixerSettings::default())
    }

    /// Creates an empty mixer.
    pub fn with_settings(name: impl Into<String>, settings: MixerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            enabled: Cell::new(true),
            table: RefCell::new(WeightTable::new()),
            cache: LiveCache::new(),
            provider: None,
            children: RefCell::new(None),
            state: RefCell::new(S::default()),
            live_child: RefCell::new(None),
            live_child_percent: Cell::new(0.0),
            previous_state_valid: Cell::new(false),
            finalize_hooks: RefCell::new(Vec::new()),
        }
    }

    /// Attaches the collaborator that reports the mixer's child sources.
    #[must_use]
    pub fn with_provider(mut self, provider: impl SourceProvider<S> + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        *self.children.get_mut() = None;
        self.cache.invalidate();
        self
    }

    /// Mixer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blend thresholds.
    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Enables or disables the mixer as a source of its parent.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        if !enabled {
            self.previous_state_valid.set(false);
        }
    }

    // ---------------------------------------------------------------------
    // Weight table
    // ---------------------------------------------------------------------

    /// Appends `source` with `weight`.
    pub fn add_source(&self, source: &SourceRef<S>, weight: f32) {
        self.add_entry(WeightEntry::new(source, weight));
    }

    /// Appends a weight entry.
    pub fn add_entry(&self, entry: WeightEntry<S>) {
        self.table.borrow_mut().append(entry);
        self.invalidate_cache();
    }

    /// Removes the first entry equal to `entry` (same source and weight).
    pub fn remove_entry(&self, entry: &WeightEntry<S>) -> bool {
        let removed = self.table.borrow_mut().remove(entry);
        self.invalidate_cache();
        removed
    }

    /// Removes the first entry for `source`.
    pub fn remove_source(&self, source: &SourceRef<S>) -> bool {
        let removed = self.table.borrow_mut().remove_source(source);
        self.invalidate_cache();
        removed
    }

    /// Replaces every entry with externally edited ones, then validates the
    /// weights.
    pub fn set_entries(&self, entries: Vec<WeightEntry<S>>) {
        {
            let mut table = self.table.borrow_mut();
            *table = WeightTable::from_entries(entries);
            table.validate();
        }
        self.invalidate_cache();
    }

    /// Number of weight entries.
    pub fn entry_count(&self) -> usize {
        self.table.borrow().len()
    }

    /// Snapshot of the weight entries in canonical order.
    pub fn entries(&self) -> Vec<WeightEntry<S>> {
        self.table.borrow().entries().to_vec()
    }

    /// Weight at `index`.
    pub fn try_weight(&self, index: usize) -> Result<f32, MixError> {
        self.table.borrow().try_weight(index)
    }

    /// Weight at `index`, or 0 (logged) when out of range.
    pub fn weight(&self, index: usize) -> f32 {
        self.table.borrow().weight(index)
    }

    /// Sets the weight at `index`.
    pub fn try_set_weight(&self, index: usize, weight: f32) -> Result<(), MixError> {
        self.table.borrow_mut().try_set_weight(index, weight)
    }

    /// Sets the weight at `index`; out of range is logged and ignored.
    pub fn set_weight(&self, index: usize, weight: f32) {
        self.table.borrow_mut().set_weight(index, weight);
    }

    /// Weight of `source`.
    pub fn try_weight_of(&self, source: &SourceRef<S>) -> Result<f32, MixError> {
        self.refresh_cache();
        self.table.borrow().try_weight_of(source)
    }

    /// Weight of `source`, or 0 (logged) when it has no entry.
    pub fn weight_of(&self, source: &SourceRef<S>) -> f32 {
        self.refresh_cache();
        self.table.borrow().weight_of(source)
    }

    /// Sets the weight of `source`.
    pub fn try_set_weight_of(&self, source: &SourceRef<S>, weight: f32) -> Result<(), MixError> {
        self.refresh_cache();
        self.table.borrow_mut().try_set_weight_of(source, weight)
    }

    /// Sets the weight of `source`; an unknown source is logged and ignored.
    pub fn set_weight_of(&self, source: &SourceRef<S>, weight: f32) {
        self.refresh_cache();
        self.table.borrow_mut().set_weight_of(source, weight);
    }

    /// Clamps every weight to be non-negative. Returns the number of changed
    /// entries.
    pub fn validate_weights(&self) -> usize {
        self.table.borrow_mut().validate()
    }

    /// Makes the first entry fully dominant and zeroes the rest.
    pub fn reset_weights(&self) {
        self.table.borrow_mut().reset();
    }

    // ---------------------------------------------------------------------
    // Live cache
    // ---------------------------------------------------------------------

    /// Drops the live cache; the next cache-dependent call rebuilds it.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
        self.previous_state_valid.set(false);
    }

    /// Rebuilds the live cache if it is dirty or holds a dropped source.
    ///
    /// Fetches the child list from the provider the first time, then prunes
    /// entries whose source has been dropped and caches the rest in table
    /// order. Returns `true` if a rebuild happened; calls made while a
    /// rebuild is already running return `false` without doing anything.
    pub fn refresh_cache(&self) -> bool {
        self.cache.mark_dirty_if_stale();
        let Some(guard) = self.cache.begin_rebuild() else {
            return false;
        };
        self.previous_state_valid.set(false);

        let needs_children = self.children.borrow().is_none();
        if needs_children {
            let fetched = self.fetch_children();
            self.children.replace(fetched);
        }

        let (pruned, live) = {
            let mut table = self.table.borrow_mut();
            let pruned = guard.rebuild_from(&mut table);
            (pruned, table.len())
        };
        if pruned > 0 {
            log::debug!(
                "Mixer '{}': pruned {pruned} entries with destroyed sources",
                self.name
            );
        }
        log::debug!(
            "Mixer '{}': live cache rebuilt ({live} sources, generation {})",
            self.name,
            self.cache.generation()
        );
        true
    }

    fn fetch_children(&self) -> Option<Vec<SourceHandle<S>>> {
        let provider = self.provider.as_ref()?;
        let sources = provider.fetch_sources().or_else(|| {
            log::debug!("Mixer '{}': no children yet, rescanning", self.name);
            provider.rescan_sources()
        });
        match sources {
            Some(sources) => Some(sources.iter().map(SourceHandle::from).collect()),
            None => {
                log::debug!("Mixer '{}': child list unavailable", self.name);
                None
            }
        }
    }

    /// Freshness of the live cache.
    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Number of completed cache rebuilds.
    pub fn cache_generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Live sources in blend order, rebuilding the cache if needed.
    pub fn cached_sources(&self) -> Vec<SourceHandle<S>> {
        self.refresh_cache();
        self.cache.sources().clone()
    }

    /// Child sources reported by the provider (empty without one).
    pub fn child_sources(&self) -> Vec<SourceHandle<S>> {
        self.refresh_cache();
        self.children.borrow().clone().unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Blending
    // ---------------------------------------------------------------------

    /// Registers a callback run on the blended state at the end of every
    /// [`update`](Self::update).
    pub fn add_finalize_hook(
        &self,
        hook: impl Fn(&dyn CameraSource<S>, PipelineStage, &mut S, f32) + 'static,
    ) {
        self.finalize_hooks.borrow_mut().push(Box::new(hook));
    }

    /// Blends the live sources for this frame.
    ///
    /// Every active source whose weight exceeds the epsilon contributes in
    /// proportion to its weight. The running blend is kept incrementally:
    /// the first qualifying state is taken as is, each later one is mixed in
    /// by `weight / total_weight_so_far`, which yields the weighted average
    /// of all qualifying states. When nothing qualifies the previous output
    /// is kept.
    pub fn update(&self, world_up: Vec3, delta_time: f32) -> BlendResult<S> {
        mixcam_core::profile_function!();
        self.refresh_cache();

        let epsilon = self.settings.epsilon;
        let mut output = self.state.borrow().clone();
        let mut total_weight = 0.0_f32;
        let mut highest_weight = 0.0_f32;
        let mut dominant: Option<SourceRef<S>> = None;

        // Cache slot i mirrors table row i; both are re-borrowed per slot so
        // callbacks into the mixer from a source cannot hit an active borrow.
        for index in 0..self.cache.len() {
            let Some(handle) = self.cache.get(index) else {
                break;
            };
            let Some(source) = handle.upgrade() else {
                self.cache.mark_dirty();
                continue;
            };
            if !source.is_active_and_enabled() {
                continue;
            }
            let weight = clamp_weight(self.table.borrow().weight(index));
            if weight <= epsilon {
                continue;
            }

            total_weight += weight;
            if total_weight == weight {
                output = source.state();
            } else {
                output = S::interpolate(&output, &source.state(), weight / total_weight);
            }

            if weight > highest_weight {
                highest_weight = weight;
                dominant = Some(source);
            }
        }

        let dominance_percent = if total_weight > epsilon {
            highest_weight / total_weight * 100.0
        } else {
            0.0
        };
        self.live_child_percent.set(dominance_percent);
        self.set_live_child(dominant.as_ref(), world_up, delta_time);
        self.run_finalize_hooks(&mut output, delta_time);

        self.state.replace(output.clone());
        self.previous_state_valid.set(true);

        BlendResult {
            state: output,
            dominant,
            dominance_percent,
        }
    }

    fn set_live_child(&self, incoming: Option<&SourceRef<S>>, world_up: Vec3, delta_time: f32) {
        let outgoing = self
            .live_child
            .borrow()
            .as_ref()
            .and_then(SourceHandle::upgrade);
        let changed = match (incoming, outgoing.as_ref()) {
            (Some(a), Some(b)) => source_key(a) != source_key(b),
            (None, None) => false,
            _ => true,
        };
        self.live_child.replace(incoming.map(SourceHandle::new));

        if !changed {
            return;
        }
        if let Some(incoming) = incoming {
            log::debug!(
                "Mixer '{}': live child {} -> {}",
                self.name,
                outgoing.as_ref().map_or("(none)", |s| s.name()),
                incoming.name()
            );
            incoming.notify_becoming_live(outgoing.as_deref(), world_up, delta_time);
        }
    }

    fn run_finalize_hooks(&self, state: &mut S, delta_time: f32) {
        let hooks = self.finalize_hooks.take();
        for hook in &hooks {
            hook(self, PipelineStage::Finalize, state, delta_time);
        }
        // Keep hooks registered from inside a hook.
        let mut slot = self.finalize_hooks.borrow_mut();
        let added = std::mem::replace(&mut *slot, hooks);
        slot.extend(added);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The last blended state.
    pub fn blended_state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Whether the last blended state is still meaningful, i.e. no cache
    /// change happened since the last [`update`](Self::update).
    pub fn previous_state_is_valid(&self) -> bool {
        self.previous_state_valid.get()
    }

    /// The dominant source of the last update, if it is still alive.
    pub fn live_child(&self) -> Option<SourceRef<S>> {
        self.live_child
            .borrow()
            .as_ref()
            .and_then(SourceHandle::upgrade)
    }

    /// Dominance percentage of the last update.
    pub fn live_child_percent(&self) -> f32 {
        self.live_child_percent.get()
    }

    /// Whether `source` contributes to the mix.
    ///
    /// With `dominant_only` this asks whether `source` was the dominant
    /// source of the last update. Otherwise it asks whether `source` has an
    /// entry with a weight above the epsilon and is active.
    pub fn is_live(&self, source: &SourceRef<S>, dominant_only: bool) -> bool {
        if dominant_only {
            return self
                .live_child
                .borrow()
                .as_ref()
                .is_some_and(|live| live.refers_to(source));
        }
        let weight = {
            let table = self.table.borrow();
            match table.position_of(source) {
                Some(index) => table.weight(index),
                None => return false,
            }
        };
        weight > self.settings.epsilon && source.is_active_and_enabled()
    }

    /// Whether `source` has an entry, regardless of weight or activity.
    pub fn is_member(&self, source: &SourceRef<S>) -> bool {
        self.table.borrow().contains(source)
    }

    /// `"[<name> <percent>%]"` for the dominant source, `"[(none)]"` without
    /// one.
    pub fn description(&self) -> String {
        match self.live_child() {
            Some(live) => format!(
                "[{} {}%]",
                live.name(),
                self.live_child_percent.get().round_ties_even() as i32
            ),
            None => "[(none)]".to_owned(),
        }
    }
}

impl<S: BlendState + Default + 'static> CameraSource<S> for MixingCamera<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active_and_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn state(&self) -> S {
        self.blended_state()
    }

    /// Forwards the transition to every live child.
    fn on_transition_from(
        &self,
        from: Option<&dyn CameraSource<S>>,
        world_up: Vec3,
        delta_time: f32,
    ) {
        self.refresh_cache();
        for index in 0..self.cache.len() {
            let Some(handle) = self.cache.get(index) else {
                break;
            };
            if let Some(child) = handle.upgrade() {
                child.on_transition_from(from, world_up, delta_time);
            }
        }
    }
}

impl<S: BlendState + 'static> fmt::Debug for MixingCamera<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixingCamera")
            .field("name", &self.name)
            .field("entries", &self.table.borrow().len())
            .field("cache", &self.cache.state())
            .field("live_child_percent", &self.live_child_percent.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Fixed {
        name: &'static str,
        value: f32,
        active: Cell<bool>,
        activations: Cell<u32>,
    }

    impl Fixed {
        fn new(name: &'static str, value: f32) -> Rc<Self> {
            Rc::new(Self {
                name,
                value,
                active: Cell::new(true),
                activations: Cell::new(0),
            })
        }
    }

    impl CameraSource<f32> for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn is_active_and_enabled(&self) -> bool {
            self.active.get()
        }
        fn state(&self) -> f32 {
            self.value
        }
        fn on_transition_from(&self, _: Option<&dyn CameraSource<f32>>, _: Vec3, _: f32) {
            self.activations.set(self.activations.get() + 1);
        }
    }

    fn up() -> Vec3 {
        Vec3::y()
    }

    #[test]
    fn weighted_pair_prefers_heavier_source() {
        let a = Fixed::new("A", 0.0);
        let b = Fixed::new("B", 8.0);
        let (sa, sb): (SourceRef<f32>, SourceRef<f32>) = (a.clone(), b.clone());

        let mixer = MixingCamera::<f32>::new("mix");
        mixer.add_source(&sa, 1.0);
        mixer.add_source(&sb, 3.0);

        let result = mixer.update(up(), 0.016);
        assert!((result.state - 6.0).abs() < 1e-6);
        assert!(result.dominant.as_ref().is_some_and(|d| Rc::ptr_eq(d, &sb)));
        assert_eq!(result.dominance_percent, 75.0);
        assert_eq!(mixer.description(), "[B 75%]");
    }

    #[test]
    fn zero_weights_keep_previous_state() {
        let a = Fixed::new("A", 2.0);
        let b = Fixed::new("B", 4.0);
        let (sa, sb): (SourceRef<f32>, SourceRef<f32>) = (a, b);

        let mixer = MixingCamera::<f32>::new("mix");
        mixer.add_source(&sa, 1.0);
        mixer.add_source(&sb, 0.0);
        assert_eq!(mixer.update(up(), 0.016).state, 2.0);

        mixer.set_weight(0, 0.0);
        let result = mixer.update(up(), 0.016);
        assert_eq!(result.state, 2.0);
        assert!(result.dominant.is_none());
        assert_eq!(result.dominance_percent, 0.0);
        assert_eq!(mixer.description(), "[(none)]");
    }

    #[test]
    fn inactive_sources_are_skipped() {
        let a = Fixed::new("A", 1.0);
        let b = Fixed::new("B", 5.0);
        b.active.set(false);
        let (sa, sb): (SourceRef<f32>, SourceRef<f32>) = (a, b.clone());

        let mixer = MixingCamera::<f32>::new("mix");
        mixer.add_source(&sa, 1.0);
        mixer.add_source(&sb, 10.0);

        let result = mixer.update(up(), 0.016);
        assert_eq!(result.state, 1.0);
        assert_eq!(result.dominance_percent, 100.0);
        assert!(!mixer.is_live(&sb, false));
        assert!(mixer.is_member(&sb));
    }

    #[test]
    fn becoming_live_is_notified_on_change_only() {
        let a = Fixed::new("A", 0.0);
        let b = Fixed::new("B", 1.0);
        let (sa, sb): (SourceRef<f32>, SourceRef<f32>) = (a.clone(), b.clone());

        let mixer = MixingCamera::<f32>::new("mix");
        mixer.add_source(&sa, 2.0);
        mixer.add_source(&sb, 1.0);

        mixer.update(up(), 0.016);
        mixer.update(up(), 0.016);
        assert_eq!(a.activations.get(), 1);
        assert_eq!(b.activations.get(), 0);

        mixer.set_weight_of(&sb, 5.0);
        mixer.update(up(), 0.016);
        assert_eq!(b.activations.get(), 1);
        assert!(mixer.is_live(&sb, true));
        assert!(!mixer.is_live(&sa, true));
        assert!(mixer.is_live(&sa, false));
    }

    #[test]
    fn finalize_hooks_see_blended_state() {
        let a = Fixed::new("A", 3.0);
        let sa: SourceRef<f32> = a;

        let mixer = MixingCamera::<f32>::new("mix");
        mixer.add_source(&sa, 1.0);
        mixer.add_finalize_hook(|owner, stage, state, _dt| {
            assert_eq!(owner.name(), "mix");
            assert_eq!(stage, PipelineStage::Finalize);
            *state += 1.0;
        });

        assert_eq!(mixer.update(up(), 0.016).state, 4.0);
        assert_eq!(mixer.blended_state(), 4.0);
        assert!(mixer.previous_state_is_valid());
    }

    #[test]
    fn structural_changes_invalidate_cache() {
        let a = Fixed::new("A", 3.0);
        let sa: SourceRef<f32> = a;

        let mixer = MixingCamera::<f32>::new("mix");
        assert_eq!(mixer.cache_state(), CacheState::Dirty);
        mixer.add_source(&sa, 1.0);
        mixer.update(up(), 0.016);
        assert_eq!(mixer.cache_state(), CacheState::Fresh);
        assert_eq!(mixer.cache_generation(), 1);

        mixer.set_weight(0, 0.5);
        assert_eq!(mixer.cache_state(), CacheState::Fresh);

        assert!(mixer.remove_source(&sa));
        assert_eq!(mixer.cache_state(), CacheState::Dirty);
        assert!(!mixer.previous_state_is_valid());
        assert!(mixer.cached_sources().is_empty());
        assert_eq!(mixer.cache_generation(), 2);
    }

    #[test]
    fn disabled_mixer_is_not_an_active_source() {
        let mixer = MixingCamera::<f32>::new("mix");
        assert!(mixer.is_active_and_enabled());
        mixer.set_enabled(false);
        assert!(!mixer.is_active_and_enabled());
        assert!(!mixer.previous_state_is_valid());
    }
}
