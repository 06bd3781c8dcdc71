//! Shared error model and configuration for pagestitch.
//!
//! This crate is the foundation depended on by all other pagestitch crates.
//! It provides:
//! - [`StitchError`] — the unified error type
//! - Configuration ([`AppConfig`], [`StitchConfig`], config loading)
//! - Host-page global scanning ([`scan_globals`])

pub mod config;
pub mod error;
pub mod globals;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_ROOT_PATH, FetchConfig, MarkersConfig, REFERENCE_DOCUMENT, RenderConfig,
    StitchConfig, StitchOverrides, StylesheetsConfig, config_dir, config_file_path, init_config,
    init_config_in, load_config, load_config_from,
};
pub use error::{Result, StitchError};
pub use globals::{merge_globals, scan_globals};
