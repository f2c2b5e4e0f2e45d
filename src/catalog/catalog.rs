//! Catalog - the master record arena and its load pipeline

use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::catalog::attribute::Attribute;
use crate::catalog::cache::CacheDir;
use crate::catalog::emulator::Emulator;
use crate::catalog::extras::Extras;
use crate::catalog::filter::Filter;
use crate::catalog::record::Record;
use crate::catalog::romlist;
use crate::catalog::stats::StatsTable;
use crate::catalog::view::View;
use crate::core::Layout;

/// Everything the load pipeline needs besides the catalog itself
pub struct LoadContext<'a> {
    pub layout: &'a Layout,
    pub cache: &'a CacheDir,
    pub emulators: &'a [Emulator],
    pub scan_availability: bool,
}

/// The master record sequence for one view's base material.
///
/// Records live in an arena of stable slots: a record's slot position is its
/// index for the lifetime of the load, deletes tombstone the slot and
/// inserts append, so existing slots never reorder. The visible sequence is
/// a separate index list, which is what clone partitioning rearranges.
#[derive(Debug, Default)]
pub struct Catalog {
    slots: Vec<Option<Record>>,
    order: Vec<u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records in the sequence
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a record by stable index
    pub fn get(&self, index: u32) -> Option<&Record> {
        self.slots.get(index as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut Record> {
        self.slots.get_mut(index as usize).and_then(|s| s.as_mut())
    }

    /// Whether the index refers to a live record
    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// Iterate live records in sequence order
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|i| self.get(*i))
    }

    /// The current sequence of record indices
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Append a record parsed from romlist columns; its index is the new
    /// arena slot
    pub fn push_row(&mut self, row: Vec<String>) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Some(Record::from_row(index, row)));
        self.order.push(index);
        index
    }

    /// Tombstone a record, removing it from the sequence.
    ///
    /// The slot is never reused, so remaining indices stay valid.
    pub fn remove(&mut self, index: u32) -> Option<Record> {
        let record = self.slots.get_mut(index as usize).and_then(|s| s.take())?;
        self.order.retain(|i| *i != index);
        Some(record)
    }

    /// Rebuild a catalog from a cached snapshot.
    ///
    /// Records carry their arena indices; sequence order is the snapshot
    /// order. Derived titles are recomputed since they are not persisted.
    pub fn from_snapshot(records: Vec<Record>) -> Self {
        let max_index = records.iter().map(|r| r.index()).max().map_or(0, |i| i + 1);
        let mut slots: Vec<Option<Record>> = (0..max_index).map(|_| None).collect();
        let mut order = Vec::with_capacity(records.len());

        for mut record in records {
            record.refresh_titles();
            let index = record.index();
            order.push(index);
            slots[index as usize] = Some(record);
        }

        Self { slots, order }
    }

    /// Clone the live sequence for caching
    pub fn snapshot(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    // =========================================================================
    // Load pipeline
    // =========================================================================

    /// Load one view's base material, walking the cache states in order:
    /// global-filter cache, catalog cache, raw romlist; then the global
    /// filter and the side-store merge. Cache failures always fall through
    /// to the next state, never abort.
    pub fn load_for_view(
        view: &View,
        ctx: &LoadContext,
        extras: &mut Extras,
        stats: &mut StatsTable,
    ) -> Self {
        let mut catalog = Self::load_base(view, ctx, extras);
        catalog.merge_sides(view, ctx, extras, stats);
        catalog
    }

    fn load_base(view: &View, ctx: &LoadContext, extras: &mut Extras) -> Self {
        // State 1: global-filter cache, only reachable with global rules
        if view.has_global_rules() {
            let key = CacheDir::global_filter_key(&view.name);
            if let Some(records) = ctx.cache.load::<Vec<Record>>(&key) {
                info!(view = %view.name, records = records.len(), "global filter cache hit");
                return Self::from_snapshot(records);
            }
        }

        // State 2: catalog cache
        let key = CacheDir::catalog_key(&view.name);
        let mut catalog = match ctx.cache.load::<Vec<Record>>(&key) {
            Some(records) => {
                info!(view = %view.name, records = records.len(), "catalog cache hit");
                Self::from_snapshot(records)
            }
            // State 3: raw source
            None => Self::load_raw(view, ctx),
        };

        // State 4: the one catalog-wide filter, applied in place
        if view.has_global_rules() {
            let before = catalog.len();
            catalog.apply_global_filter(&view.global_filter(), extras);
            info!(
                view = %view.name,
                loaded = before,
                kept = catalog.len(),
                "applied global filter"
            );
            let key = CacheDir::global_filter_key(&view.name);
            if let Err(err) = ctx.cache.save(&key, &catalog.snapshot()) {
                warn!(view = %view.name, %err, "failed to cache global filter result");
            }
        }

        catalog
    }

    fn load_raw(view: &View, ctx: &LoadContext) -> Self {
        let path = ctx.layout.romlist_path(&view.romlist);
        let rows = match romlist::read(&path) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    romlist = %view.romlist,
                    path = %path.display(),
                    %err,
                    "failed to read romlist, starting empty"
                );
                Vec::new()
            }
        };

        let mut catalog = Self::new();
        for row in rows {
            catalog.push_row(row);
        }

        // Masters must precede their clones so group representatives in a
        // clone-grouped build prefer a parent over a clone.
        if view.clone_grouping {
            catalog.partition_parents_first();
        }

        info!(view = %view.name, records = catalog.len(), "parsed romlist");

        let key = CacheDir::catalog_key(&view.name);
        if let Err(err) = ctx.cache.save(&key, &catalog.snapshot()) {
            warn!(view = %view.name, %err, "failed to cache parsed catalog");
        }

        catalog
    }

    /// Stably reorder the sequence so non-clone records precede clones.
    ///
    /// Arena indices are untouched: only the visible order changes.
    fn partition_parents_first(&mut self) {
        let mut order = std::mem::take(&mut self.order);
        order.sort_by_key(|&i| {
            self.slots
                .get(i as usize)
                .and_then(|s| s.as_ref())
                .map(|r| !r.is_parent())
                .unwrap_or(true)
        });
        self.order = order;
    }

    /// Remove records failing the filter from the working set, absorbing
    /// their favourite/tag flags into the extras side-store
    pub fn apply_global_filter(&mut self, filter: &Filter, extras: &mut Extras) {
        let order = std::mem::take(&mut self.order);
        let mut kept = Vec::with_capacity(order.len());

        for index in order {
            let passes = self
                .get(index)
                .map(|record| filter.apply(record))
                .unwrap_or(false);
            if passes {
                kept.push(index);
            } else if let Some(record) = self.slots.get_mut(index as usize).and_then(|s| s.take())
            {
                extras.absorb(&record);
            }
        }

        self.order = kept;
    }

    /// State 5: merge favourites, tags, availability, play statistics and a
    /// fresh shuffle order into the loaded records
    fn merge_sides(
        &mut self,
        view: &View,
        ctx: &LoadContext,
        extras: &Extras,
        stats: &mut StatsTable,
    ) {
        let order = self.order.clone();

        for &index in &order {
            if let Some(record) = self.get_mut(index) {
                extras.apply(record);
            }
        }

        if ctx.scan_availability {
            self.merge_availability(ctx);
        }

        self.merge_stats(ctx, stats);
        self.assign_shuffle();

        info!(view = %view.name, records = self.len(), "merged side stores");
    }

    fn merge_availability(&mut self, ctx: &LoadContext) {
        let present: HashSet<String> = self.iter().map(|r| r.emulator().to_string()).collect();

        let mut available: HashMap<String, HashSet<String>> = HashMap::new();
        for name in present {
            if let Some(emulator) = ctx.emulators.iter().find(|e| e.name == name) {
                available.insert(name, emulator.scan_roms());
            }
        }

        let order = self.order.clone();
        for &index in &order {
            if let Some(record) = self.get_mut(index) {
                let found = available
                    .get(record.emulator())
                    .map(|roms| roms.contains(record.name()))
                    .unwrap_or(false);
                let value = if found { "1" } else { "0" };
                record.set(Attribute::Available, value);
            }
        }
    }

    fn merge_stats(&mut self, ctx: &LoadContext, stats: &mut StatsTable) {
        let order = self.order.clone();
        for &index in &order {
            let Some(record) = self.get(index) else { continue };
            let (emulator, name) = (record.emulator().to_string(), record.name().to_string());
            if emulator.is_empty() {
                continue;
            }
            let s = stats.get(ctx.layout, ctx.cache, &emulator, &name);
            if let Some(record) = self.get_mut(index) {
                record.set(Attribute::PlayedCount, &s.played_count.to_string());
                record.set(Attribute::PlayedTime, &s.played_time.to_string());
                record.set(Attribute::PlayedLast, &s.last_played.to_string());
                record.set(Attribute::Score, &s.score.to_string());
            }
        }
    }

    /// Stamp a fresh random permutation into the Shuffle attribute.
    ///
    /// Generated per load and never cached.
    fn assign_shuffle(&mut self) {
        let mut positions: Vec<usize> = (0..self.order.len()).collect();
        positions.shuffle(&mut rand::rng());

        let order = self.order.clone();
        for (&index, position) in order.iter().zip(positions) {
            if let Some(record) = self.get_mut(index) {
                record.set(Attribute::Shuffle, &position.to_string());
            }
        }
    }
}
