//! Play statistics - per-item side files with a lazy in-memory table

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::catalog::cache::CacheDir;
use crate::core::Layout;

/// The four play-statistics fields of one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayStats {
    pub played_count: u32,
    pub played_time: u64,
    pub last_played: i64,
    pub score: i32,
}

impl PlayStats {
    /// Parse the newline-delimited stat file body. Missing trailing fields
    /// default to zero.
    fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let mut next = |default| {
            lines
                .next()
                .and_then(|l| l.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        Self {
            played_count: next(0).max(0) as u32,
            played_time: next(0).max(0) as u64,
            last_played: next(0),
            score: next(0) as i32,
        }
    }

    fn format(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n",
            self.played_count, self.played_time, self.last_played, self.score
        )
    }
}

/// In-memory play-statistics table, one map per emulator.
///
/// Loaded lazily: one directory scan per emulator the first time any of its
/// items needs statistics, mirrored to the emulator's cache entity. Owned by
/// the session; there is no process-global table.
#[derive(Debug, Default)]
pub struct StatsTable {
    tables: HashMap<String, HashMap<String, PlayStats>>,
    loaded: HashSet<String>,
    dirty: HashSet<String>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the statistics for one item, loading the emulator's table first
    /// if needed
    pub fn get(
        &mut self,
        layout: &Layout,
        cache: &CacheDir,
        emulator: &str,
        rom: &str,
    ) -> PlayStats {
        self.ensure_loaded(layout, cache, emulator);
        self.tables
            .get(emulator)
            .and_then(|t| t.get(rom))
            .copied()
            .unwrap_or_default()
    }

    /// Apply an update to one item's statistics, writing the side file and
    /// marking the emulator's cache mirror stale
    pub fn update<F>(&mut self, layout: &Layout, cache: &CacheDir, emulator: &str, rom: &str, f: F) -> PlayStats
    where
        F: FnOnce(&mut PlayStats),
    {
        self.ensure_loaded(layout, cache, emulator);
        let table = self.tables.entry(emulator.to_string()).or_default();
        let stats = table.entry(rom.to_string()).or_default();
        f(stats);
        let updated = *stats;
        self.dirty.insert(emulator.to_string());

        if let Err(err) = write_stat_file(&stat_path(layout, emulator, rom), &updated) {
            warn!(emulator, rom, %err, "failed to write stat file");
        }
        updated
    }

    /// Record one play session
    pub fn record_play(
        &mut self,
        layout: &Layout,
        cache: &CacheDir,
        emulator: &str,
        rom: &str,
        seconds: u64,
        now: i64,
    ) -> PlayStats {
        self.update(layout, cache, emulator, rom, |stats| {
            stats.played_count += 1;
            stats.played_time += seconds;
            stats.last_played = now;
        })
    }

    /// Mirror dirty emulator tables to their cache entities
    pub fn mirror(&mut self, cache: &CacheDir) {
        let dirty: Vec<String> = self.dirty.iter().cloned().collect();
        for emulator in dirty {
            let table = self.tables.get(&emulator).cloned().unwrap_or_default();
            let key = CacheDir::stats_key(&emulator);
            cache.invalidate(&key);
            if cache.save(&key, &table).is_ok() {
                self.dirty.remove(&emulator);
            }
        }
    }

    fn ensure_loaded(&mut self, layout: &Layout, cache: &CacheDir, emulator: &str) {
        if self.loaded.contains(emulator) {
            return;
        }
        self.loaded.insert(emulator.to_string());

        let key = CacheDir::stats_key(emulator);
        if let Some(table) = cache.load::<HashMap<String, PlayStats>>(&key) {
            debug!(emulator, items = table.len(), "stats cache hit");
            self.tables.insert(emulator.to_string(), table);
            return;
        }

        let table = scan_stat_dir(&layout.stats_dir().join(emulator));
        debug!(emulator, items = table.len(), "scanned stats directory");
        if let Err(err) = cache.save(&key, &table) {
            warn!(emulator, %err, "failed to mirror stats to cache");
        }
        self.tables.insert(emulator.to_string(), table);
    }
}

fn stat_path(layout: &Layout, emulator: &str, rom: &str) -> PathBuf {
    layout
        .stats_dir()
        .join(emulator)
        .join(format!("{}.stat", rom))
}

fn scan_stat_dir(dir: &Path) -> HashMap<String, PlayStats> {
    let mut table = HashMap::new();
    if !dir.is_dir() {
        return table;
    }

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "stat") {
            if let Some(rom) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(content) = std::fs::read_to_string(path) {
                    table.insert(rom.to_string(), PlayStats::parse(&content));
                }
            }
        }
    }
    table
}

fn write_stat_file(path: &Path, stats: &PlayStats) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(stats.format().as_bytes())
}
