//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::Layout;

/// Romdeck configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// View selected when none is named on the command line
    pub default_view: Option<String>,

    /// Scan emulator rom directories for availability during load
    pub scan_availability: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(layout: Option<&Layout>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/romdeck/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                if let Ok(contents) = std::fs::read_to_string(&global_path) {
                    if let Ok(global) = serde_yml::from_str::<Config>(&contents) {
                        config.merge(global);
                    }
                }
            }
        }

        // 3. Frontend config (.romdeck/config.yaml)
        if let Some(layout) = layout {
            let local_path = layout.conf_dir().join("config.yaml");
            if local_path.exists() {
                if let Ok(contents) = std::fs::read_to_string(&local_path) {
                    if let Ok(local) = serde_yml::from_str::<Config>(&contents) {
                        config.merge(local);
                    }
                }
            }
        }

        // 4. Environment variables
        if let Ok(view) = std::env::var("ROMDECK_VIEW") {
            config.default_view = Some(view);
        }

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "romdeck")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.default_view.is_some() {
            self.default_view = other.default_view;
        }
        if other.scan_availability.is_some() {
            self.scan_availability = other.scan_availability;
        }
    }

    /// Whether the availability scan runs during catalog load
    pub fn scan_availability(&self) -> bool {
        self.scan_availability.unwrap_or(true)
    }
}
