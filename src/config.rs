use std::path::{Path, PathBuf};

use crate::settings::SETTINGS_FILE;

pub const DATA_DIR_VAR: &str = "EDUSCAN_DATA_DIR";
pub const MODEL_DIR_VAR: &str = "EDUSCAN_MODEL_DIR";

const MODEL_FILE: &str = "model.json";
const SCALER_FILE: &str = "scaler.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

impl AppConfig {
    /// Command-line overrides win over the environment, which wins over defaults.
    pub fn resolve(data_dir: Option<PathBuf>, model_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir
            .or_else(|| std::env::var_os(DATA_DIR_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data"));
        let model_dir = model_dir
            .or_else(|| std::env::var_os(MODEL_DIR_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("models"));
        Self::with_dirs(data_dir, &model_dir)
    }

    pub fn with_dirs(data_dir: PathBuf, model_dir: &Path) -> Self {
        Self {
            data_dir,
            model_path: model_dir.join(MODEL_FILE),
            scaler_path: model_dir.join(SCALER_FILE),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}
