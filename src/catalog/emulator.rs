//! Emulator definitions - rom location metadata for availability scans

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One emulator definition file (YAML under `emulators/`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emulator {
    pub name: String,

    /// Directory scanned for rom files
    pub rom_path: PathBuf,

    /// Accepted rom file extensions; empty accepts everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rom_ext: Vec<String>,
}

impl Emulator {
    /// Load all emulator definitions from a directory.
    ///
    /// Files that fail to parse are silently skipped.
    pub fn load_all(dir: &Path) -> Vec<Emulator> {
        let mut emulators = Vec::new();

        if !dir.exists() {
            return emulators;
        }

        let Ok(entries) = std::fs::read_dir(dir) else {
            return emulators;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "yaml") {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    if let Ok(emulator) = serde_yml::from_str::<Emulator>(&content) {
                        emulators.push(emulator);
                    }
                }
            }
        }

        emulators
    }

    /// Scan the rom directory once, collecting available rom names (file
    /// stems). A missing directory yields the empty set.
    pub fn scan_roms(&self) -> HashSet<String> {
        let mut names = HashSet::new();

        if !self.rom_path.exists() {
            debug!(emulator = %self.name, path = %self.rom_path.display(), "rom path missing");
            return names;
        }

        for entry in WalkDir::new(&self.rom_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !self.rom_ext.is_empty() {
                let ext = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default();
                if !self.rom_ext.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                    continue;
                }
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }

        debug!(emulator = %self.name, roms = names.len(), "scanned rom directory");
        names
    }
}
