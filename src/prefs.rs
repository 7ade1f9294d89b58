use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::app_config_dir;
use crate::error::AppError;
use crate::model::RepoKey;

const PREFERENCES_FILE_NAME: &str = "preferences.json";
const KEY_PREFIX: &str = "tagfleet.";

pub const SELECTED_BRANCHES_KEY: &str = "selectedBranches";
pub const BULK_TAG_BRANCH_KEY: &str = "bulkTagBranch";
pub const ADVANCED_SETTINGS_KEY: &str = "advancedSettings";

pub const DEFAULT_BRANCH: &str = "dev";
pub const DEFAULT_COMMIT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvancedSettings {
    pub auto_fetch_commits: bool,
    pub default_commit_limit: u32,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            auto_fetch_commits: false,
            default_commit_limit: DEFAULT_COMMIT_LIMIT,
        }
    }
}

impl AdvancedSettings {
    pub fn sanitized(mut self) -> Self {
        if self.default_commit_limit == 0 {
            self.default_commit_limit = DEFAULT_COMMIT_LIMIT;
        }
        self
    }
}

/// Best-effort key/value persistence for user choices.
///
/// The whole document is held in memory and re-written on every `set`; reads never
/// touch the disk. Failures are logged and swallowed: `get` falls back to the caller's
/// default, `set` keeps the in-memory value even when the write fails.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl PreferenceStore {
    pub fn open_default() -> Self {
        Self::open(app_config_dir().join(PREFERENCES_FILE_NAME))
    }

    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let values = read_document(&path);
        Self {
            path: Some(path),
            values,
        }
    }

    /// Store that never touches the disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Map::new(),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.values.get(&namespaced(key)) else {
            return default;
        };
        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(target: "tagfleet::prefs", key, error = %err, "stored preference is malformed; using default");
                default
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(target: "tagfleet::prefs", key, error = %err, "preference could not be serialized");
                return;
            }
        };
        self.values.insert(namespaced(key), value);
        if let Err(err) = self.persist() {
            warn!(target: "tagfleet::prefs", key, error = %err, "failed to persist preferences");
        }
    }

    pub fn selected_branch(&self, repo: &RepoKey) -> String {
        self.selected_branches()
            .remove(&repo.storage_key())
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }

    /// Read-modify-write of the whole selection mapping. Must stay free of blocking
    /// calls between the read and the write.
    pub fn set_selected_branch(&mut self, repo: &RepoKey, branch: &str) {
        let mut selections = self.selected_branches();
        selections.insert(repo.storage_key(), branch.to_string());
        self.set(SELECTED_BRANCHES_KEY, &selections);
    }

    pub fn bulk_tag_branch(&self) -> String {
        self.get(BULK_TAG_BRANCH_KEY, String::new())
    }

    pub fn set_bulk_tag_branch(&mut self, branch: &str) {
        self.set(BULK_TAG_BRANCH_KEY, &branch.to_string());
    }

    pub fn advanced_settings(&self) -> AdvancedSettings {
        self.get(ADVANCED_SETTINGS_KEY, AdvancedSettings::default())
            .sanitized()
    }

    pub fn set_advanced_settings(&mut self, settings: AdvancedSettings) {
        self.set(ADVANCED_SETTINGS_KEY, &settings.sanitized());
    }

    /// Drops every namespaced key.
    pub fn clear(&mut self) {
        self.values.retain(|key, _| !key.starts_with(KEY_PREFIX));
        if let Err(err) = self.persist() {
            warn!(target: "tagfleet::prefs", error = %err, "failed to persist cleared preferences");
        }
    }

    fn selected_branches(&self) -> BTreeMap<String, String> {
        self.get(SELECTED_BRANCHES_KEY, BTreeMap::new())
    }

    fn persist(&self) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

fn read_document(path: &Path) -> Map<String, Value> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(target: "tagfleet::prefs", error = %err, path = %path.display(), "no stored preferences");
            return Map::new();
        }
    };
    match serde_json::from_str::<Map<String, Value>>(&contents) {
        Ok(values) => values,
        Err(err) => {
            warn!(target: "tagfleet::prefs", error = %err, path = %path.display(), "preferences file is malformed; starting empty");
            Map::new()
        }
    }
}
