// TabSearch platform paths
// Resolves where the persisted options file lives on Windows, macOS, and Linux.
//
// Uses `cfg(target_os)` to pick the implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for TabSearch.
///
/// - **Linux**: `~/.config/tabsearch` (or `$XDG_CONFIG_HOME/tabsearch`)
/// - **macOS**: `~/Library/Application Support/TabSearch`
/// - **Windows**: `%APPDATA%/TabSearch`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Default location of the persisted options.
pub fn default_options_path() -> PathBuf {
    get_config_dir().join("options.json")
}
