// TabSearch option store
// Flat key/value options: an in-memory store for tests and a JSON file store
// at the platform-specific config path.

use std::future::Future;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::platform;
use crate::types::errors::OptionsError;
use crate::types::options::{SearchOptions, ALL_KEYS};

/// Asynchronous access to a flat mapping of named options.
pub trait OptionStore: Send + Sync + 'static {
    /// Values for `keys`; keys with no stored value are absent from the map.
    fn get(
        &self,
        keys: &[&str],
    ) -> impl Future<Output = Result<Map<String, Value>, OptionsError>> + Send;

    /// Merge `items` into the stored mapping.
    fn set(&self, items: Map<String, Value>) -> impl Future<Output = Result<(), OptionsError>> + Send;
}

/// Options only accept booleans and strings.
fn validate_items(items: &Map<String, Value>) -> Result<(), OptionsError> {
    for (key, value) in items {
        if key.is_empty() {
            return Err(OptionsError::InvalidKey("Key cannot be empty".to_string()));
        }
        if !matches!(value, Value::Bool(_) | Value::String(_)) {
            return Err(OptionsError::InvalidValue(format!(
                "Option '{}' must be a boolean or string, got {}",
                key, value
            )));
        }
    }
    Ok(())
}

fn select(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| map.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Load [`SearchOptions`], writing the defaults back on first run.
///
/// A failing store never blocks a search: errors are logged and defaults used.
pub async fn load_search_options<S: OptionStore>(store: &S) -> SearchOptions {
    let stored = match store.get(&ALL_KEYS).await {
        Ok(map) => map,
        Err(e) => {
            log::warn!("failed to read options, using defaults: {}", e);
            return SearchOptions::default();
        }
    };

    if SearchOptions::is_first_run(&stored) {
        // Only keys never stored get their default written; the rest stay as set.
        let missing: Map<String, Value> = SearchOptions::default()
            .to_map()
            .into_iter()
            .filter(|(key, _)| matches!(stored.get(key), None | Some(Value::Null)))
            .collect();
        if let Err(e) = store.set(missing).await {
            log::warn!("failed to persist default options: {}", e);
        }
    }

    SearchOptions::from_map(&stored)
}

/// Persist every field of `options`.
pub async fn save_search_options<S: OptionStore>(
    store: &S,
    options: &SearchOptions,
) -> Result<(), OptionsError> {
    let mut normalized = options.clone();
    normalized.normalize();
    store.set(normalized.to_map()).await
}

/// Options held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    items: Mutex<Map<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Map<String, Value>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.items.lock().clone()
    }
}

impl OptionStore for MemoryOptionStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, OptionsError> {
        Ok(select(&self.items.lock(), keys))
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), OptionsError> {
        validate_items(&items)?;
        self.items.lock().extend(items);
        Ok(())
    }
}

/// Options persisted as one JSON object on disk.
pub struct JsonFileOptionStore {
    path: PathBuf,
}

impl JsonFileOptionStore {
    /// If `path_override` is `None`, uses `options.json` in the platform
    /// config directory.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let path = path_override.unwrap_or_else(platform::default_options_path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as an empty mapping; a malformed one is an error.
    async fn read_all(&self) -> Result<Map<String, Value>, OptionsError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(OptionsError::IoError(format!(
                    "Failed to read options file: {}",
                    e
                )))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(OptionsError::SerializationError(format!(
                "Options file must hold a JSON object, got {}",
                other
            ))),
            Err(e) => Err(OptionsError::SerializationError(format!(
                "Failed to parse options file: {}",
                e
            ))),
        }
    }
}

impl OptionStore for JsonFileOptionStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, OptionsError> {
        let all = self.read_all().await?;
        Ok(select(&all, keys))
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), OptionsError> {
        validate_items(&items)?;
        let mut all = self.read_all().await?;
        all.extend(items);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                OptionsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(all)).map_err(|e| {
            OptionsError::SerializationError(format!("Failed to serialize options: {}", e))
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| OptionsError::IoError(format!("Failed to write options file: {}", e)))
    }
}
