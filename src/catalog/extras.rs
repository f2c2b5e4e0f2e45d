//! Favourites and tags side files, plus the side-store that preserves
//! flags on records removed by the global filter

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::catalog::record::Record;
use crate::core::Layout;

/// Key identifying a record across loads: (name, emulator)
pub type ItemKey = (String, String);

/// Per-view favourites and tag membership.
///
/// Backed by plain-text side files (`Name;Emulator` per line). Also acts as
/// the side-store for records the global filter removed: their favourite
/// flag and tags are absorbed here so a future re-filter never drops them.
#[derive(Debug, Default)]
pub struct Extras {
    favourites: BTreeSet<ItemKey>,
    tags: BTreeMap<String, BTreeSet<ItemKey>>,
    favourites_dirty: bool,
    tags_dirty: BTreeSet<String>,
}

impl Extras {
    /// Load the side files for a view. Missing files mean empty sets.
    pub fn load(layout: &Layout, view: &str) -> Self {
        let mut extras = Self::default();

        extras.favourites = read_item_file(&layout.favourites_path(view));

        let tags_dir = layout.tags_dir(view);
        if tags_dir.is_dir() {
            if let Ok(entries) = std::fs::read_dir(&tags_dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().map_or(false, |e| e == "tag") {
                        if let Some(tag) = path.file_stem().and_then(|s| s.to_str()) {
                            extras.tags.insert(tag.to_string(), read_item_file(&path));
                        }
                    }
                }
            }
        }

        debug!(
            view,
            favourites = extras.favourites.len(),
            tags = extras.tags.len(),
            "loaded side files"
        );
        extras
    }

    fn key(record: &Record) -> ItemKey {
        (record.name().to_string(), record.emulator().to_string())
    }

    /// Stamp a record's favourite flag and tag string from the side sets
    pub fn apply(&self, record: &mut Record) {
        use crate::catalog::attribute::Attribute;

        let key = Self::key(record);
        if self.favourites.contains(&key) {
            record.set(Attribute::Favourite, "1");
        }
        let tags: Vec<&str> = self
            .tags
            .iter()
            .filter(|(_, members)| members.contains(&key))
            .map(|(tag, _)| tag.as_str())
            .collect();
        if !tags.is_empty() {
            let joined = tags.join(";");
            record.set(Attribute::Tags, &joined);
        }
    }

    /// Absorb the favourite flag and tags of a record leaving the working
    /// set, so they survive the removal.
    pub fn absorb(&mut self, record: &Record) {
        let key = Self::key(record);
        if record.is_favourite() && self.favourites.insert(key.clone()) {
            self.favourites_dirty = true;
        }
        for tag in record.tags() {
            let members = self.tags.entry(tag.to_string()).or_default();
            if members.insert(key.clone()) {
                self.tags_dirty.insert(tag.to_string());
            }
        }
    }

    pub fn is_favourite(&self, name: &str, emulator: &str) -> bool {
        self.favourites
            .contains(&(name.to_string(), emulator.to_string()))
    }

    /// Set or clear a favourite, returning whether membership changed
    pub fn set_favourite(&mut self, name: &str, emulator: &str, on: bool) -> bool {
        let key = (name.to_string(), emulator.to_string());
        let changed = if on {
            self.favourites.insert(key)
        } else {
            self.favourites.remove(&key)
        };
        if changed {
            self.favourites_dirty = true;
        }
        changed
    }

    /// Add or remove tag membership, returning whether it changed
    pub fn set_tag(&mut self, name: &str, emulator: &str, tag: &str, on: bool) -> bool {
        let key = (name.to_string(), emulator.to_string());
        let members = self.tags.entry(tag.to_string()).or_default();
        let changed = if on {
            members.insert(key)
        } else {
            members.remove(&key)
        };
        if changed {
            self.tags_dirty.insert(tag.to_string());
        }
        changed
    }

    /// Rewrite side files whose in-memory state changed. Failures are
    /// best-effort: the in-memory state stays authoritative.
    pub fn save_if_dirty(&mut self, layout: &Layout, view: &str) {
        if self.favourites_dirty {
            if let Err(err) = write_item_file(&layout.favourites_path(view), &self.favourites) {
                warn!(view, %err, "failed to write favourites file");
            } else {
                self.favourites_dirty = false;
            }
        }

        if !self.tags_dirty.is_empty() {
            let tags_dir = layout.tags_dir(view);
            if let Err(err) = std::fs::create_dir_all(&tags_dir) {
                warn!(view, %err, "failed to create tags directory");
                return;
            }
            let dirty: Vec<String> = self.tags_dirty.iter().cloned().collect();
            for tag in dirty {
                let path = tags_dir.join(format!("{}.tag", tag));
                let members = self.tags.get(&tag).cloned().unwrap_or_default();
                let result = if members.is_empty() {
                    remove_if_present(&path)
                } else {
                    write_item_file(&path, &members)
                };
                match result {
                    Ok(()) => {
                        self.tags_dirty.remove(&tag);
                    }
                    Err(err) => warn!(view, tag, %err, "failed to write tag file"),
                }
            }
        }
    }
}

fn read_item_file(path: &Path) -> BTreeSet<ItemKey> {
    let mut items = BTreeSet::new();
    let Ok(content) = std::fs::read_to_string(path) else {
        return items;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, emulator) = line.split_once(';').unwrap_or((line, ""));
        items.insert((name.to_string(), emulator.to_string()));
    }
    items
}

fn write_item_file(path: &Path, items: &BTreeSet<ItemKey>) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for (name, emulator) in items {
        writeln!(file, "{};{}", name, emulator)?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::attribute::Attribute;
    use tempfile::tempdir;

    fn layout() -> (tempfile::TempDir, Layout) {
        let tmp = tempdir().unwrap();
        let layout = Layout::init(tmp.path()).unwrap();
        (tmp, layout)
    }

    #[test]
    fn test_load_missing_files_is_empty() {
        let (_tmp, layout) = layout();
        let extras = Extras::load(&layout, "arcade");
        assert!(!extras.is_favourite("pacman", "mame"));
    }

    #[test]
    fn test_favourites_roundtrip() {
        let (_tmp, layout) = layout();

        let mut extras = Extras::load(&layout, "arcade");
        assert!(extras.set_favourite("pacman", "mame", true));
        assert!(!extras.set_favourite("pacman", "mame", true));
        extras.save_if_dirty(&layout, "arcade");

        let reloaded = Extras::load(&layout, "arcade");
        assert!(reloaded.is_favourite("pacman", "mame"));
    }

    #[test]
    fn test_tags_roundtrip_and_cleanup() {
        let (_tmp, layout) = layout();

        let mut extras = Extras::load(&layout, "arcade");
        extras.set_tag("pacman", "mame", "maze", true);
        extras.save_if_dirty(&layout, "arcade");
        assert!(layout.tags_dir("arcade").join("maze.tag").exists());

        let mut reloaded = Extras::load(&layout, "arcade");
        reloaded.set_tag("pacman", "mame", "maze", false);
        reloaded.save_if_dirty(&layout, "arcade");
        assert!(!layout.tags_dir("arcade").join("maze.tag").exists());
    }

    #[test]
    fn test_apply_stamps_record() {
        let (_tmp, layout) = layout();
        let mut extras = Extras::load(&layout, "arcade");
        extras.set_favourite("pacman", "mame", true);
        extras.set_tag("pacman", "mame", "maze", true);
        extras.set_tag("pacman", "mame", "classic", true);

        let mut record = Record::new(0);
        record.set(Attribute::Name, "pacman");
        record.set(Attribute::Emulator, "mame");
        extras.apply(&mut record);

        assert!(record.is_favourite());
        assert!(record.has_tag("maze"));
        assert!(record.has_tag("classic"));
    }

    #[test]
    fn test_absorb_preserves_flags() {
        let (_tmp, layout) = layout();
        let mut extras = Extras::load(&layout, "arcade");

        let mut record = Record::new(0);
        record.set(Attribute::Name, "outrun");
        record.set(Attribute::Emulator, "mame");
        record.set(Attribute::Favourite, "1");
        record.add_tag("racing");

        extras.absorb(&record);
        assert!(extras.is_favourite("outrun", "mame"));

        extras.save_if_dirty(&layout, "arcade");
        let reloaded = Extras::load(&layout, "arcade");
        assert!(reloaded.is_favourite("outrun", "mame"));
    }
}
