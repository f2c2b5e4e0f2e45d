//! Session - the single in-process owner of a catalog and its built views
//!
//! All operations are synchronous and run on the caller's thread. Ordering
//! is caller-enforced: an attribute mutation must have its fix-filters pass
//! applied before the next read of the affected view, which the producer
//! API does internally.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::attribute::Attribute;
use crate::catalog::cache::{CacheDir, SourceSnapshot};
use crate::catalog::catalog::{Catalog, LoadContext};
use crate::catalog::emulator::Emulator;
use crate::catalog::extras::Extras;
use crate::catalog::filter::Filter;
use crate::catalog::record::Record;
use crate::catalog::stats::StatsTable;
use crate::catalog::view::{self, FilterEntry, View};
use crate::core::{Config, Layout};

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no view named '{0}'")]
    ViewNotFound(String),

    #[error("no view selected")]
    NoViewSelected,

    #[error("filter ordinal {0} out of range")]
    FilterOutOfRange(usize),

    #[error("no record at position {0}")]
    PositionOutOfRange(usize),

    #[error("no record named '{0}' in the current filter")]
    RecordNotFound(String),
}

/// The currently selected view with its loaded catalog and built entries
struct Selected {
    view: View,
    catalog: Catalog,
    extras: Extras,
    entries: Vec<FilterEntry>,
    cache: CacheDir,
}

/// Owns configuration, view definitions and the currently loaded catalog.
///
/// There is exactly one owner of a given catalog at a time; the session
/// provides no locking.
pub struct Session {
    layout: Layout,
    config: Config,
    views: Vec<View>,
    emulators: Vec<Emulator>,
    stats: StatsTable,
    selected: Option<Selected>,
}

impl Session {
    /// Open a session over a frontend layout
    pub fn open(layout: Layout, config: Config) -> Self {
        let views = View::load_all(&layout.views_dir());
        let emulators = Emulator::load_all(&layout.emulators_dir());
        debug!(views = views.len(), emulators = emulators.len(), "session opened");
        Self {
            layout,
            config,
            views,
            emulators,
            stats: StatsTable::new(),
            selected: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// The view name to use when the caller names none
    pub fn default_view(&self) -> Option<&str> {
        self.config
            .default_view
            .as_deref()
            .or_else(|| self.views.first().map(|v| v.name.as_str()))
    }

    // =========================================================================
    // Consumer API
    // =========================================================================

    /// Select a view, driving the load pipeline and building (or
    /// rehydrating) every sub-filter entry
    pub fn select_view(&mut self, name: &str) -> Result<(), SessionError> {
        let mut view = self
            .views
            .iter()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| SessionError::ViewNotFound(name.to_string()))?;

        // A view with no sub-filters gets exactly one implicit pass-all
        if view.filters.is_empty() {
            view.filters.push(Filter::new("All"));
        }

        let cache = CacheDir::new(&self.layout.cache_dir(), &view.romlist);

        // Source snapshot guard: when the romlist file or emulator set
        // changed since the cache was written, the whole view tree is stale.
        let current = SourceSnapshot::current(
            &self.layout.romlist_path(&view.romlist),
            self.emulators.iter().map(|e| e.name.clone()).collect(),
        );
        let snapshot_key = CacheDir::snapshot_key(&view.name);
        let stored: Option<SourceSnapshot> = cache.load(&snapshot_key);
        if stored.as_ref() != Some(&current) {
            if stored.is_some() {
                info!(view = name, "source snapshot changed, invalidating view cache");
            }
            cache.invalidate_view(&view.name);
            if let Err(err) = cache.save(&snapshot_key, &current) {
                tracing::warn!(view = name, %err, "failed to write source snapshot");
            }
        }

        let mut extras = Extras::load(&self.layout, &view.name);
        let ctx = LoadContext {
            layout: &self.layout,
            cache: &cache,
            emulators: &self.emulators,
            scan_availability: self.config.scan_availability(),
        };
        let catalog = Catalog::load_for_view(&view, &ctx, &mut extras, &mut self.stats);

        let mut entries = Vec::with_capacity(view.filters.len());
        for ordinal in 0..view.filters.len() {
            let entry = match cache.load_entry(&view.name, ordinal, &catalog) {
                Some(entry) => {
                    view.filters[ordinal].matched = entry.matched;
                    debug!(view = name, ordinal, "filter entry cache hit");
                    entry
                }
                None => {
                    let entry =
                        view::build(&mut view.filters[ordinal], &catalog, view.clone_grouping);
                    let key = CacheDir::sub_filter_key(&view.name, ordinal);
                    if let Err(err) = cache.save(&key, &entry) {
                        tracing::warn!(view = name, ordinal, %err, "failed to cache filter entry");
                    }
                    entry
                }
            };
            entries.push(entry);
        }

        info!(
            view = name,
            records = catalog.len(),
            filters = entries.len(),
            "view selected"
        );
        self.selected = Some(Selected {
            view,
            catalog,
            extras,
            entries,
            cache,
        });
        Ok(())
    }

    /// The currently selected view definition
    pub fn current_view(&self) -> Result<&View, SessionError> {
        self.selected
            .as_ref()
            .map(|s| &s.view)
            .ok_or(SessionError::NoViewSelected)
    }

    /// Number of top-level entries in one sub-filter
    pub fn filter_size(&self, ordinal: usize) -> Result<usize, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        selected
            .entries
            .get(ordinal)
            .map(|e| e.len())
            .ok_or(SessionError::FilterOutOfRange(ordinal))
    }

    /// Pre-limit size of one sub-filter, for "N of M" display
    pub fn filter_matched(&self, ordinal: usize) -> Result<usize, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        selected
            .view
            .filters
            .get(ordinal)
            .map(|f| f.matched)
            .ok_or(SessionError::FilterOutOfRange(ordinal))
    }

    /// Get the record at a top-level position of one sub-filter
    pub fn record_at(&self, ordinal: usize, position: usize) -> Result<&Record, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        let entry = selected
            .entries
            .get(ordinal)
            .ok_or(SessionError::FilterOutOfRange(ordinal))?;
        let index = entry
            .order
            .get(position)
            .ok_or(SessionError::PositionOutOfRange(position))?;
        selected
            .catalog
            .get(*index)
            .ok_or(SessionError::PositionOutOfRange(position))
    }

    /// Get the clone group behind a top-level position
    pub fn clone_group(
        &self,
        ordinal: usize,
        position: usize,
    ) -> Result<Vec<&Record>, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        let entry = selected
            .entries
            .get(ordinal)
            .ok_or(SessionError::FilterOutOfRange(ordinal))?;
        if position >= entry.len() {
            return Err(SessionError::PositionOutOfRange(position));
        }
        Ok(entry
            .group_at(&selected.catalog, position)
            .iter()
            .filter_map(|i| selected.catalog.get(*i))
            .collect())
    }

    /// Find the top-level position of a record by name
    pub fn position_of(&self, ordinal: usize, name: &str) -> Result<usize, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        let entry = selected
            .entries
            .get(ordinal)
            .ok_or(SessionError::FilterOutOfRange(ordinal))?;
        entry
            .order
            .iter()
            .position(|i| {
                selected
                    .catalog
                    .get(*i)
                    .map(|r| r.name() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| SessionError::RecordNotFound(name.to_string()))
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Set an attribute on the record at (ordinal, position), then fix the
    /// filters targeting that attribute.
    ///
    /// Favourite and tag writes also update the view's side files.
    pub fn set_attribute(
        &mut self,
        ordinal: usize,
        position: usize,
        attr: Attribute,
        value: &str,
    ) -> Result<bool, SessionError> {
        let selected = self.selected.as_mut().ok_or(SessionError::NoViewSelected)?;
        let entry = selected
            .entries
            .get(ordinal)
            .ok_or(SessionError::FilterOutOfRange(ordinal))?;
        let index = *entry
            .order
            .get(position)
            .ok_or(SessionError::PositionOutOfRange(position))?;
        let record = selected
            .catalog
            .get_mut(index)
            .ok_or(SessionError::PositionOutOfRange(position))?;

        let changed = record.set(attr, value);
        if !changed {
            return Ok(false);
        }

        let (name, emulator) = (record.name().to_string(), record.emulator().to_string());
        match attr {
            Attribute::Favourite => {
                selected
                    .extras
                    .set_favourite(&name, &emulator, value == "1");
            }
            Attribute::Tags => {
                // Reconcile tag membership with the new tag string
                let tags: Vec<String> = value
                    .split(';')
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
                for tag in &tags {
                    selected.extras.set_tag(&name, &emulator, tag, true);
                }
            }
            _ => {}
        }
        let view_name = selected.view.name.clone();
        selected.extras.save_if_dirty(&self.layout, &view_name);

        self.fix_filters(attr)?;
        Ok(true)
    }

    /// Record one play session for the record at (ordinal, position) and
    /// fix the filters targeting the play-statistics attributes
    pub fn record_play(
        &mut self,
        ordinal: usize,
        position: usize,
        seconds: u64,
        now: i64,
    ) -> Result<(), SessionError> {
        let (name, emulator) = {
            let record = self.record_at(ordinal, position)?;
            (record.name().to_string(), record.emulator().to_string())
        };

        let selected = self.selected.as_mut().ok_or(SessionError::NoViewSelected)?;
        let stats = self.stats.record_play(
            &self.layout,
            &selected.cache,
            &emulator,
            &name,
            seconds,
            now,
        );

        let entry = selected
            .entries
            .get(ordinal)
            .ok_or(SessionError::FilterOutOfRange(ordinal))?;
        let index = *entry
            .order
            .get(position)
            .ok_or(SessionError::PositionOutOfRange(position))?;
        if let Some(record) = selected.catalog.get_mut(index) {
            record.set(Attribute::PlayedCount, &stats.played_count.to_string());
            record.set(Attribute::PlayedTime, &stats.played_time.to_string());
            record.set(Attribute::PlayedLast, &stats.last_played.to_string());
        }

        self.fix_filters(Attribute::PlayedCount)?;
        self.fix_filters(Attribute::PlayedTime)?;
        self.fix_filters(Attribute::PlayedLast)?;
        Ok(())
    }

    /// Rebuild exactly the sub-filters whose rules or sort key target the
    /// mutated attribute, leaving every other entry untouched in memory and
    /// on disk; invalidate the attribute family's cache entities.
    pub fn fix_filters(&mut self, attr: Attribute) -> Result<(), SessionError> {
        let selected = self.selected.as_mut().ok_or(SessionError::NoViewSelected)?;

        if attr.is_stat() {
            self.stats.mirror(&selected.cache);
        }

        let mut rebuilt = 0usize;
        for ordinal in 0..selected.view.filters.len() {
            if !selected.view.filters[ordinal].targets(attr) {
                continue;
            }
            let key = CacheDir::sub_filter_key(&selected.view.name, ordinal);
            selected.cache.invalidate(&key);

            let entry = view::build(
                &mut selected.view.filters[ordinal],
                &selected.catalog,
                selected.view.clone_grouping,
            );
            if let Err(err) = selected.cache.save(&key, &entry) {
                tracing::warn!(view = %selected.view.name, ordinal, %err, "failed to re-cache filter entry");
            }
            selected.entries[ordinal] = entry;
            rebuilt += 1;
        }

        debug!(attr = %attr, rebuilt, "fixed filters for attribute write");
        Ok(())
    }

    /// Replace (or append) a sub-filter definition.
    ///
    /// A structural change makes ordinal-based cache keys unstable, so the
    /// whole view cache tree is invalidated and the view reloaded.
    pub fn replace_filter(
        &mut self,
        view_name: &str,
        ordinal: usize,
        filter: Filter,
    ) -> Result<(), SessionError> {
        let view = self
            .views
            .iter_mut()
            .find(|v| v.name == view_name)
            .ok_or_else(|| SessionError::ViewNotFound(view_name.to_string()))?;

        if ordinal < view.filters.len() {
            view.filters[ordinal] = filter;
        } else {
            view.filters.push(filter);
        }
        if let Err(err) = view.save(&self.layout.views_dir()) {
            tracing::warn!(view = view_name, %err, "failed to write view definition");
        }

        let romlist = view.romlist.clone();
        let cache = CacheDir::new(&self.layout.cache_dir(), &romlist);
        cache.invalidate_view(view_name);
        info!(view = view_name, ordinal, "filter replaced, view cache invalidated");

        if self
            .selected
            .as_ref()
            .map(|s| s.view.name == view_name)
            .unwrap_or(false)
        {
            self.select_view(view_name)?;
        }
        Ok(())
    }

    /// Drop every cache entity belonging to a view
    pub fn invalidate_view(&mut self, view_name: &str) -> Result<(), SessionError> {
        let view = self
            .views
            .iter()
            .find(|v| v.name == view_name)
            .ok_or_else(|| SessionError::ViewNotFound(view_name.to_string()))?;

        let cache = CacheDir::new(&self.layout.cache_dir(), &view.romlist);
        cache.invalidate_view(view_name);
        info!(view = view_name, "view cache invalidated");
        Ok(())
    }

    /// Summarize built sub-filters as (name, size, matched) for display
    pub fn filter_summary(&self) -> Result<Vec<(String, usize, usize)>, SessionError> {
        let selected = self.selected.as_ref().ok_or(SessionError::NoViewSelected)?;
        Ok(selected
            .view
            .filters
            .iter()
            .zip(&selected.entries)
            .map(|(f, e)| (f.name.clone(), e.len(), f.matched))
            .collect())
    }

    /// Play statistics for a record, by emulator and name
    pub fn stats_for(
        &mut self,
        emulator: &str,
        name: &str,
    ) -> Result<crate::catalog::stats::PlayStats, SessionError> {
        let cache = self
            .selected
            .as_ref()
            .map(|s| s.cache.clone())
            .ok_or(SessionError::NoViewSelected)?;
        Ok(self.stats.get(&self.layout, &cache, emulator, name))
    }

    /// Map of emulator name to definition, for launching and display
    pub fn emulators(&self) -> HashMap<&str, &Emulator> {
        self.emulators
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::rule::{CompareOp, Rule};
    use tempfile::tempdir;

    const ROMLIST: &str = "\
#Name;Title;Emulator;CloneOf;Year;Manufacturer;Category\n\
pacman;Pac-Man;mame;;1980;Namco;Maze\n\
mspacman;Ms. Pac-Man;mame;pacman;1981;Midway;Maze\n\
galaga;Galaga;mame;;1981;Namco;Shooter\n\
outrun;Out Run;mame;;1986;Sega;Racing\n";

    fn setup() -> (tempfile::TempDir, Session) {
        let tmp = tempdir().unwrap();
        let layout = Layout::init(tmp.path()).unwrap();
        std::fs::write(layout.romlist_path("mame"), ROMLIST).unwrap();

        let view = View {
            name: "arcade".to_string(),
            romlist: "mame".to_string(),
            emulator: Some("mame".to_string()),
            clone_grouping: false,
            global_rules: Vec::new(),
            filters: vec![
                Filter {
                    sort_by: Some(Attribute::Title),
                    ..Filter::new("All")
                },
                Filter {
                    rules: vec![Rule::new(Attribute::Favourite, CompareOp::Equals, "1")],
                    ..Filter::new("Favourites")
                },
            ],
        };
        view.save(&layout.views_dir()).unwrap();

        let config = Config {
            scan_availability: Some(false),
            ..Config::default()
        };
        let session = Session::open(layout, config);
        (tmp, session)
    }

    #[test]
    fn test_select_and_read() {
        let (_tmp, mut session) = setup();
        session.select_view("arcade").unwrap();

        assert_eq!(session.filter_size(0).unwrap(), 4);
        assert_eq!(session.filter_size(1).unwrap(), 0);

        // Sorted by title: Galaga, Ms. Pac-Man, Out Run, Pac-Man
        assert_eq!(session.record_at(0, 0).unwrap().name(), "galaga");
        assert_eq!(session.record_at(0, 3).unwrap().name(), "pacman");

        assert!(matches!(
            session.select_view("nope"),
            Err(SessionError::ViewNotFound(_))
        ));
    }

    #[test]
    fn test_favourite_toggle_fixes_targeting_filter_only() {
        let (_tmp, mut session) = setup();
        session.select_view("arcade").unwrap();

        let pos = session.position_of(0, "pacman").unwrap();
        session
            .set_attribute(0, pos, Attribute::Favourite, "1")
            .unwrap();

        // The favourites filter saw the change immediately
        assert_eq!(session.filter_size(1).unwrap(), 1);
        assert_eq!(session.record_at(1, 0).unwrap().name(), "pacman");

        // And it survives a fresh session (side file + rebuilt caches)
        let layout = session.layout().clone();
        let mut fresh = Session::open(
            layout,
            Config {
                scan_availability: Some(false),
                ..Config::default()
            },
        );
        fresh.select_view("arcade").unwrap();
        assert_eq!(fresh.filter_size(1).unwrap(), 1);
    }

    #[test]
    fn test_invalidation_precision_leaves_untargeted_files_untouched() {
        let (_tmp, mut session) = setup();
        session.select_view("arcade").unwrap();

        let cache_dir = session.layout().cache_dir().join("mame");
        let untargeted = cache_dir.join(CacheDir::sub_filter_key("arcade", 0));
        let before = std::fs::read(&untargeted).unwrap();

        let pos = session.position_of(0, "galaga").unwrap();
        session
            .set_attribute(0, pos, Attribute::Favourite, "1")
            .unwrap();

        // Filter 0 sorts by Title and never references Favourite: its cache
        // bytes are identical
        let after = std::fs::read(&untargeted).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_replace_filter_invalidates_whole_tree() {
        let (_tmp, mut session) = setup();
        session.select_view("arcade").unwrap();

        let cache_dir = session.layout().cache_dir().join("mame");
        assert!(cache_dir.join(CacheDir::catalog_key("arcade")).exists());

        session
            .replace_filter(
                "arcade",
                2,
                Filter {
                    rules: vec![Rule::new(Attribute::Year, CompareOp::GreaterEqual, "1985")],
                    ..Filter::new("Modern")
                },
            )
            .unwrap();

        // The view reloaded with three filters; the new one is built
        assert_eq!(session.filter_size(2).unwrap(), 1);
        assert_eq!(session.record_at(2, 0).unwrap().name(), "outrun");
    }

    #[test]
    fn test_record_play_updates_stats() {
        let (_tmp, mut session) = setup();
        session.select_view("arcade").unwrap();

        let pos = session.position_of(0, "outrun").unwrap();
        session.record_play(0, pos, 120, 1700000000).unwrap();

        let record = session.record_at(0, pos).unwrap();
        assert_eq!(record.get(Attribute::PlayedCount), "1");
        assert_eq!(record.get(Attribute::PlayedTime), "120");

        let stats = session.stats_for("mame", "outrun").unwrap();
        assert_eq!(stats.played_count, 1);
    }

    #[test]
    fn test_view_without_filters_gets_implicit_all() {
        let (_tmp, mut session) = setup();

        let bare = View {
            name: "bare".to_string(),
            romlist: "mame".to_string(),
            emulator: None,
            clone_grouping: false,
            global_rules: Vec::new(),
            filters: Vec::new(),
        };
        bare.save(&session.layout().views_dir()).unwrap();
        session.views.push(bare);

        session.select_view("bare").unwrap();
        assert_eq!(session.current_view().unwrap().filters.len(), 1);
        assert_eq!(session.filter_size(0).unwrap(), 4);
    }
}
