use crate::error::{Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Date/time layouts tried, in order, when a value is parsed without an explicit format.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y",
    "%m/%d/%Y",
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Rows returned by `Dataset::preview` (default: 10)
    pub preview_rows: usize,
    /// Ordered chrono layouts used by date conversion and date filters
    pub date_formats: Vec<String>,
    /// Initial `threshold` offered when an outlier-removal step is created
    pub default_outlier_threshold: f64,
    /// Initial percentiles offered when a winsorize step is created
    pub default_winsorize_lower: f64,
    pub default_winsorize_upper: f64,
    /// When true the text `contains` filter compares case-sensitively
    pub text_contains_case_sensitive: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preview_rows: 10,
            date_formats: DEFAULT_DATE_FORMATS
                .iter()
                .map(|f| (*f).to_owned())
                .collect(),
            default_outlier_threshold: 3.0,
            default_winsorize_lower: 0.05,
            default_winsorize_upper: 0.95,
            text_contains_case_sensitive: false,
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(crate::utils::app_data_dir()?.join("config.json"))
}

/// Loads settings from the default location, falling back to defaults when the
/// file is missing or unreadable.
pub fn load_settings() -> EngineSettings {
    match get_config_path() {
        Ok(path) => load_settings_from(&path),
        Err(e) => {
            tracing::debug!("No config location available ({e}), using defaults");
            EngineSettings::default()
        }
    }
}

pub fn load_settings_from(path: &Path) -> EngineSettings {
    if path.exists()
        && let Ok(content) = std::fs::read_to_string(path)
    {
        match serde_json::from_str::<EngineSettings>(&content) {
            Ok(settings) => return settings,
            Err(e) => tracing::warn!("Ignoring malformed config {}: {e}", path.display()),
        }
    }
    EngineSettings::default()
}

pub fn save_settings(settings: &EngineSettings) -> Result<()> {
    save_settings_to(settings, &get_config_path()?)
}

pub fn save_settings_to(settings: &EngineSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");

        let settings = EngineSettings {
            preview_rows: 25,
            text_contains_case_sensitive: true,
            ..Default::default()
        };
        save_settings_to(&settings, &path)?;

        assert_eq!(load_settings_from(&path), settings);
        Ok(())
    }

    #[test]
    fn test_missing_and_partial_config_use_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("absent.json");
        assert_eq!(load_settings_from(&missing), EngineSettings::default());

        let partial = dir.path().join("partial.json");
        std::fs::write(&partial, r#"{ "preview_rows": 3 }"#)?;
        let loaded = load_settings_from(&partial);
        assert_eq!(loaded.preview_rows, 3);
        assert_eq!(loaded.date_formats.len(), DEFAULT_DATE_FORMATS.len());
        Ok(())
    }

    #[test]
    fn test_malformed_config_falls_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ preview_rows: ")?;
        assert_eq!(load_settings_from(&path), EngineSettings::default());
        Ok(())
    }
}
