use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::infrastructure::error::AppError;

/// Stem of the file that carries a directory suite's own settings.
pub const INIT_FILE_STEM: &str = "__init__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// File extensions (without the dot) recognised as test data.
    #[serde(default = "default_suite_extensions")]
    pub suite_extensions: Vec<String>,

    /// Extension used when an init file has to be created on save.
    #[serde(default = "default_extension")]
    pub default_extension: String,

    /// Number of spaces written between cells.
    #[serde(default = "default_cell_separator_width")]
    pub cell_separator_width: usize,
}

fn default_suite_extensions() -> Vec<String> {
    vec!["robot".to_string(), "txt".to_string(), "resource".to_string()]
}

fn default_extension() -> String {
    "robot".to_string()
}

fn default_cell_separator_width() -> usize {
    4
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            suite_extensions: default_suite_extensions(),
            default_extension: default_extension(),
            cell_separator_width: default_cell_separator_width(),
        }
    }
}

impl EditorSettings {
    /// Whether `path` has one of the configured test data extensions.
    pub fn is_data_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.suite_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    pub fn is_init_file(&self, path: &Path) -> bool {
        path.file_stem().and_then(|s| s.to_str()) == Some(INIT_FILE_STEM) && self.is_data_file(path)
    }

    /// Where a new init file for `directory` is written.
    pub fn new_init_file(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}.{}", INIT_FILE_STEM, self.default_extension))
    }

    /// Load settings from disk, or create default if not exists
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => settings.validated(),
                Err(e) => {
                    tracing::warn!("Failed to parse settings: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist, use defaults
                let default = Self::default();
                // Try to save defaults for next time
                let _ = default.save();
                default
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), AppError> {
        if self.suite_extensions.is_empty() {
            return Err(AppError::Settings(
                "at least one suite extension is required".to_string(),
            ));
        }
        let config_path = Self::get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("cannot create config dir: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)
            .map_err(|e| AppError::Settings(format!("cannot write settings: {}", e)))?;

        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("suitepad");
        path.push("settings.json");
        path
    }

    fn validated(mut self) -> Self {
        if self.suite_extensions.is_empty() {
            self.suite_extensions = default_suite_extensions();
        }
        if self.cell_separator_width < 2 {
            self.cell_separator_width = 2;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EditorSettings::default();
        assert_eq!(settings.suite_extensions, vec!["robot", "txt", "resource"]);
        assert_eq!(settings.default_extension, "robot");
        assert_eq!(settings.cell_separator_width, 4);
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{"default_extension": "txt"}"#;
        let settings: EditorSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.default_extension, "txt");
        assert_eq!(settings.cell_separator_width, 4);
    }

    #[test]
    fn test_validated_repairs_unusable_values() {
        let json = r#"{"suite_extensions": [], "cell_separator_width": 1}"#;
        let settings: EditorSettings = serde_json::from_str::<EditorSettings>(json).unwrap().validated();
        assert_eq!(settings.suite_extensions.len(), 3);
        // One space would not separate cells at all
        assert_eq!(settings.cell_separator_width, 2);
    }

    #[test]
    fn test_data_and_init_file_detection() {
        let settings = EditorSettings::default();
        assert!(settings.is_data_file(Path::new("/p/tests.robot")));
        assert!(settings.is_data_file(Path::new("/p/resource.TXT")));
        assert!(!settings.is_data_file(Path::new("/p/notes.md")));
        assert!(settings.is_init_file(Path::new("/p/__init__.txt")));
        assert!(!settings.is_init_file(Path::new("/p/__init__.py")));
    }

    #[test]
    fn test_new_init_file_uses_default_extension() {
        let settings = EditorSettings {
            default_extension: "txt".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.new_init_file(Path::new("/p")),
            PathBuf::from("/p/__init__.txt")
        );
    }
}
