//! Core module - configuration and on-disk layout

pub mod config;
pub mod layout;

pub use config::Config;
pub use layout::{Layout, LayoutError};
