//! # keyward-settings
//!
//! Configuration for the keyward identity store.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`KeywardSettings::default()`]
//! 2. **User file**: `~/.keyward/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `KEYWARD_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use keyward_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("database: {}", settings.storage.database_path);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, keyward_home, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
