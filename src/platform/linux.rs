// TabSearch config path for Linux: $XDG_CONFIG_HOME/tabsearch or ~/.config/tabsearch

use std::env;
use std::path::PathBuf;

pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("tabsearch");
        }
    }
    let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
    PathBuf::from(home).join(".config").join("tabsearch")
}
