//! INI configuration.
//!
//! The configuration file lives at `~/.config/arsession/config.ini` on Linux
//! (the platform config directory elsewhere). Every key is optional; missing
//! keys keep their defaults.
//!
//! ```ini
//! [source]
//! type = webcam
//!
//! [marker]
//! type = barcode
//! value = 5
//!
//! [lifecycle]
//! resize_policy = recompute
//! init_timeout_ms = 10000
//! init_attempts = 3
//! ```
//!
//! See [`DEFAULT_CONFIG_TEMPLATE`] for every key with its default.

mod file;

use std::path::PathBuf;

pub use file::{ConfigFile, LifecycleSettings, DEFAULT_CONFIG_TEMPLATE};

/// Application directory name under the platform config directory.
pub const APP_DIR_NAME: &str = "arsession";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Directory holding the configuration file.
///
/// Falls back to `./arsession` when the platform has no config directory.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Full path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}
