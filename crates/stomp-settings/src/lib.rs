//! # stomp-settings
//!
//! Layered configuration for the STOMP broker.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`BrokerSettings::default()`]
//! 2. **Settings file**: JSON, deep-merged over defaults
//! 3. **Environment variables**: `STOMP_*` overrides

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
