//! Operational settings for the organizer.
//!
//! Defaults, then an optional JSON file (`--config` or `ORGANIZER_CONFIG`),
//! then `ORGANIZER_*` environment variables. Scoring weights are not
//! configurable; they live as constants next to the code that uses them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{OrganizerError, Result};

pub const CONFIG_PATH_VAR: &str = "ORGANIZER_CONFIG";
pub const DEFAULT_ADDR: &str = "127.0.0.1:21955";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// HTTP bind address for the service binary
    pub addr: String,
    /// Similar items must score above this
    pub search_threshold: f64,
    pub max_similar_items: usize,
    /// Most recent corpus items scanned for personalization
    pub recent_window: usize,
    pub max_merge_candidates: usize,
    pub max_groups: usize,
    pub max_group_suggestions: usize,
    pub max_smart_names: usize,
    pub suggest_merges: bool,
    pub suggest_groups: bool,
    pub suggest_names: bool,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            search_threshold: 0.3,
            max_similar_items: 10,
            recent_window: 10,
            max_merge_candidates: 5,
            max_groups: 20,
            max_group_suggestions: 2,
            max_smart_names: 3,
            suggest_merges: true,
            suggest_groups: true,
            suggest_names: true,
        }
    }
}

impl OrganizerConfig {
    /// Resolve the full configuration from file and process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| OrganizerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| OrganizerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded organizer config from {}", path.display());
        Ok(config)
    }

    /// Overlay `ORGANIZER_*` variables. `lookup` returns a variable's value if set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("ORGANIZER_ADDR") {
            self.addr = addr;
        }
        override_with(&lookup, "ORGANIZER_SEARCH_THRESHOLD", &mut self.search_threshold)?;
        override_with(&lookup, "ORGANIZER_MAX_SIMILAR_ITEMS", &mut self.max_similar_items)?;
        override_with(&lookup, "ORGANIZER_RECENT_WINDOW", &mut self.recent_window)?;
        override_with(&lookup, "ORGANIZER_MAX_MERGE_CANDIDATES", &mut self.max_merge_candidates)?;
        override_with(&lookup, "ORGANIZER_MAX_GROUPS", &mut self.max_groups)?;
        override_with(&lookup, "ORGANIZER_MAX_GROUP_SUGGESTIONS", &mut self.max_group_suggestions)?;
        override_with(&lookup, "ORGANIZER_MAX_SMART_NAMES", &mut self.max_smart_names)?;
        override_with(&lookup, "ORGANIZER_SUGGEST_MERGES", &mut self.suggest_merges)?;
        override_with(&lookup, "ORGANIZER_SUGGEST_GROUPS", &mut self.suggest_groups)?;
        override_with(&lookup, "ORGANIZER_SUGGEST_NAMES", &mut self.suggest_names)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.search_threshold) {
            return Err(OrganizerError::InvalidConfig(format!(
                "search_threshold must be within [0, 1], got {}",
                self.search_threshold
            )));
        }
        if self.addr.trim().is_empty() {
            return Err(OrganizerError::InvalidConfig("addr must not be empty".to_string()));
        }
        Ok(())
    }
}

fn override_with<F, T>(lookup: &F, var: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(var) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| OrganizerError::invalid_env(var, &raw))?;
        debug!("Config override from {}", var);
    }
    Ok(())
}
