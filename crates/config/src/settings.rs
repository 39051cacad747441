// User settings
// Loaded from ~/.config/recap/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which spreadsheet engine `recap run` uses when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// JSON workbook fixtures
    Memory,
    /// Excel files through calamine (read-only)
    #[default]
    Xlsx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Profile TOML used when `--profile` is not given
    #[serde(rename = "recap.profile")]
    pub profile: Option<PathBuf>,

    /// Session file carrying the dedup ledger between runs
    #[serde(rename = "recap.sessionFile")]
    pub session_file: Option<PathBuf>,

    #[serde(rename = "recap.engine")]
    pub engine: EngineKind,

    /// Directory for exports given without a path
    #[serde(rename = "export.directory")]
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: None,
            session_file: None,
            engine: EngineKind::default(),
            export_dir: None,
        }
    }
}

/// `~/.config/recap`, or `./recap` when the platform has no config dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recap")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        config_dir().join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. Missing or unreadable files give defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Session file to use: the configured one, else `session.json` next to
    /// the settings file.
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| config_dir().join("session.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine, EngineKind::Xlsx);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            profile: Some(PathBuf::from("/etc/recap/complaints.toml")),
            engine: EngineKind::Memory,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"recap.engine\": \"memory\""));
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn comments_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // where exports go\n  \"export.directory\": \"/tmp/out\"\n}\n",
        )
        .unwrap();
        assert_eq!(Settings::load_from(&path).export_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn explicit_session_file_wins() {
        let settings = Settings {
            session_file: Some(PathBuf::from("/tmp/s.json")),
            ..Default::default()
        };
        assert_eq!(settings.session_path(), PathBuf::from("/tmp/s.json"));
        assert!(Settings::default().session_path().ends_with("recap/session.json"));
    }
}
