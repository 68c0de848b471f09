use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::PitwallError;
use crate::telemetry::SessionType;

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "pitwall";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the stored session files. Falls back to the platform data directory
    pub data_dir: Option<PathBuf>,
    pub default_year: u16,
    pub default_event: String,
    pub default_session: SessionType,
    pub pretty_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_year: 2023,
            default_event: "Monaco Grand Prix".to_string(),
            default_session: SessionType::Q,
            pretty_output: false,
        }
    }
}

impl AppConfig {
    /// Location of the config file in the platform config directory
    pub fn default_path() -> Result<PathBuf, PitwallError> {
        Ok(dirs::config_dir()
            .ok_or(PitwallError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    pub fn from_local_file() -> Result<Option<Self>, PitwallError> {
        Self::from_file(&Self::default_path()?)
    }

    /// Read a config file, `None` when it does not exist
    pub fn from_file(config_path: &Path) -> Result<Option<Self>, PitwallError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), PitwallError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PitwallError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }

    /// Directory holding session files: the override, then the configured directory, then
    /// `<data_dir>/pitwall/sessions`
    pub fn session_root(&self, data_dir_override: Option<&Path>) -> Result<PathBuf, PitwallError> {
        if let Some(dir) = data_dir_override.or(self.data_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        Ok(dirs::data_dir()
            .ok_or(PitwallError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"default_year": 2021, "default_session": "R"}"#).unwrap();
        assert_eq!(config.default_year, 2021);
        assert_eq!(config.default_session, SessionType::R);
        assert_eq!(config.default_event, "Monaco Grand Prix");
        assert!(config.data_dir.is_none());
        assert!(!config.pretty_output);
    }

    #[test]
    fn test_sprint_sessions_use_short_codes() {
        let config: AppConfig = serde_json::from_str(r#"{"default_session": "SQ"}"#).unwrap();
        assert_eq!(config.default_session, SessionType::SprintQualifying);

        let saved = serde_json::to_string(&AppConfig {
            default_session: SessionType::Sprint,
            ..Default::default()
        })
        .unwrap();
        assert!(saved.contains(r#""default_session":"S""#));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        assert!(AppConfig::from_file(&path).unwrap().is_none());

        let config = AppConfig {
            data_dir: Some(temp_dir.path().join("sessions")),
            pretty_output: true,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_corrupt_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(PitwallError::ConfigSerializeError { .. })
        ));
    }

    #[test]
    fn test_session_root_precedence() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/configured")),
            ..Default::default()
        };
        assert_eq!(
            config.session_root(Some(Path::new("/override"))).unwrap(),
            PathBuf::from("/override")
        );
        assert_eq!(
            config.session_root(None).unwrap(),
            PathBuf::from("/configured")
        );
    }
}
