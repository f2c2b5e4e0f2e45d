//! Frontend root discovery and directory structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker directory identifying a romdeck root
const MARKER_DIR: &str = ".romdeck";

/// Represents a romdeck frontend directory tree
#[derive(Debug, Clone)]
pub struct Layout {
    /// Root directory (parent of .romdeck/)
    root: PathBuf,
}

impl Layout {
    /// Find the frontend root by walking up from the current directory
    pub fn discover() -> Result<Self, LayoutError> {
        let current =
            std::env::current_dir().map_err(|e| LayoutError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the frontend root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, LayoutError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| LayoutError::IoError(e.to_string()))?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(LayoutError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new frontend structure at the given path
    pub fn init(path: &Path) -> Result<Self, LayoutError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let marker = root.join(MARKER_DIR);
        if marker.exists() {
            return Err(LayoutError::AlreadyExists(root.clone()));
        }

        std::fs::create_dir_all(marker.join("cache"))
            .map_err(|e| LayoutError::IoError(e.to_string()))?;

        let config_path = marker.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| LayoutError::IoError(e.to_string()))?;

        for dir in ["romlists", "emulators", "views", "stats"] {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| LayoutError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Romdeck Configuration

# View selected when none is named on the command line
# default_view: ""

# Scan emulator rom directories for file availability during load
# scan_availability: true
"#
    }

    /// Get the frontend root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .romdeck configuration directory
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Get the on-disk cache root (one subdirectory per catalog)
    pub fn cache_dir(&self) -> PathBuf {
        self.conf_dir().join("cache")
    }

    /// Get the directory holding raw romlist files
    pub fn romlists_dir(&self) -> PathBuf {
        self.root.join("romlists")
    }

    /// Get the directory holding emulator definition files
    pub fn emulators_dir(&self) -> PathBuf {
        self.root.join("emulators")
    }

    /// Get the directory holding view definition files
    pub fn views_dir(&self) -> PathBuf {
        self.root.join("views")
    }

    /// Get the directory holding per-emulator play statistics
    pub fn stats_dir(&self) -> PathBuf {
        self.root.join("stats")
    }

    /// Get the path of a raw romlist by name
    pub fn romlist_path(&self, name: &str) -> PathBuf {
        self.romlists_dir().join(format!("{}.txt", name))
    }

    /// Get the path of a view's favourites side file
    pub fn favourites_path(&self, view: &str) -> PathBuf {
        self.views_dir().join(format!("{}.fav", view))
    }

    /// Get the directory holding a view's per-tag side files
    pub fn tags_dir(&self, view: &str) -> PathBuf {
        self.views_dir().join(view)
    }
}

/// Errors that can occur during layout operations
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("not a romdeck directory (searched from {searched_from:?}). Run 'romdeck init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("romdeck directory already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let layout = Layout::init(tmp.path()).unwrap();

        assert!(layout.conf_dir().exists());
        assert!(layout.conf_dir().join("config.yaml").exists());
        assert!(layout.cache_dir().is_dir());
        assert!(layout.romlists_dir().is_dir());
        assert!(layout.emulators_dir().is_dir());
        assert!(layout.views_dir().is_dir());
        assert!(layout.stats_dir().is_dir());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Layout::init(tmp.path()).unwrap();

        let err = Layout::init(tmp.path()).unwrap_err();
        assert!(matches!(err, LayoutError::AlreadyExists(_)));
    }

    #[test]
    fn test_discover_finds_marker() {
        let tmp = tempdir().unwrap();
        Layout::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let layout = Layout::discover_from(&subdir).unwrap();
        assert_eq!(
            layout.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Layout::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, LayoutError::NotFound { .. }));
    }

    #[test]
    fn test_romlist_path() {
        let tmp = tempdir().unwrap();
        let layout = Layout::init(tmp.path()).unwrap();
        assert!(layout
            .romlist_path("mame")
            .to_string_lossy()
            .ends_with("romlists/mame.txt"));
    }
}
