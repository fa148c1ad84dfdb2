use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StorageWriteError;

pub const SETTINGS_FILE: &str = "app_settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    English,
    Somali,
    Arabic,
}

/// Preferences shared with the presentation layer. Unknown keys written by
/// other tools are carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_language")]
    pub language: Language,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_language() -> Language {
    Language::English
}

fn default_theme() -> String {
    "light".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            theme: default_theme(),
            offline_mode: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl AppSettings {
    /// Falls back to defaults when the file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("using default settings, {} unreadable: {err}", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!("ignoring malformed settings {}: {err}", path.display());
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageWriteError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageWriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body).map_err(|source| StorageWriteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_malformed_settings_use_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        assert_eq!(AppSettings::load(&path), AppSettings::default());

        fs::write(&path, "{ language: ").unwrap();
        assert_eq!(AppSettings::load(&path), AppSettings::default());
    }

    #[test]
    fn save_preserves_unknown_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{"language":"Somali","theme":"dark","offline_mode":true,"font_size":14}"#,
        )
        .unwrap();

        let mut settings = AppSettings::load(&path);
        assert_eq!(settings.language, Language::Somali);
        assert!(settings.offline_mode);
        settings.language = Language::Arabic;
        settings.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["language"], "Arabic");
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["font_size"], 14);
    }

    #[test]
    fn settings_do_not_touch_record_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = crate::store::RecordStore::open(tmp.path());
        store
            .assessments
            .append(crate::store::tests::ahmed())
            .unwrap();

        AppSettings::default()
            .save(&tmp.path().join(SETTINGS_FILE))
            .unwrap();
        assert_eq!(store.assessments.load_all().len(), 1);
    }
}
