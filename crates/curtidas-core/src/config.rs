use home::home_dir;
use std::path::{Path, PathBuf};

use crate::constant::{
    CONFIG_DIR, CONFIG_ENV, CONFIG_FILE, DEFAULT_BASE_URL, FAILURE_BANNER_MS, REDIRECT_HOME,
    REDIRECT_LOGIN, REDIRECT_PROFILE, SUCCESS_BANNER_MS,
};
use crate::{CurtidasError, CurtidasResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CurtidasConfig {
    /// Base URL of the backend API. Example: http://127.0.0.1:8000
    pub base_url: String,
    /// How long a success banner stays up, in milliseconds.
    pub success_banner_ms: u64,
    /// How long a failure banner stays up, in milliseconds.
    pub failure_banner_ms: u64,
    /// Navigation target after a confirmed login.
    pub home_redirect: String,
    /// Navigation target after a confirmed registration.
    pub login_redirect: String,
    /// Navigation target after a confirmed profile update.
    pub profile_redirect: String,
    /// Directory holding the config file.
    #[serde(skip)]
    pub dirpath: PathBuf,
    /// Path of the config file itself.
    #[serde(skip)]
    pub filepath: PathBuf,
}

impl Default for CurtidasConfig {
    fn default() -> Self {
        let home_dir = home_dir().unwrap_or_else(|| {
            std::env::current_dir().expect("Unable to get current working directory")
        });
        let dirpath = home_dir.join(CONFIG_DIR);
        let filepath = dirpath.join(CONFIG_FILE);
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            success_banner_ms: SUCCESS_BANNER_MS,
            failure_banner_ms: FAILURE_BANNER_MS,
            home_redirect: REDIRECT_HOME.into(),
            login_redirect: REDIRECT_LOGIN.into(),
            profile_redirect: REDIRECT_PROFILE.into(),
            dirpath,
            filepath,
        }
    }
}

impl CurtidasConfig {
    /// Config file location: the `CURTIDASCONF` env var when set,
    /// otherwise `~/.curtidas/curtidas.toml`.
    pub fn resolve_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default().filepath,
        }
    }

    /// Load from `path`, or fall back to defaults when no file exists.
    pub fn load_or_default(path: &Path) -> CurtidasResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> CurtidasResult<Self> {
        let buf = std::fs::read_to_string(path)?;
        let mut config: CurtidasConfig = toml::from_str(&buf)
            .map_err(|err| CurtidasError::config_error(format!("Parsing error: {err}")))?;
        config.set_filepath(path.to_path_buf())?;
        Ok(config)
    }

    /// Write the config to its filepath.
    pub fn save(&self) -> CurtidasResult<()> {
        if !std::fs::exists(&self.dirpath)? {
            std::fs::create_dir_all(&self.dirpath)?;
        }
        let content = toml::to_string(self)
            .map_err(|err| CurtidasError::config_error(format!("Encoding error: {err}")))?;
        std::fs::write(&self.filepath, content)?;
        Ok(())
    }

    pub fn set_filepath(&mut self, path: PathBuf) -> CurtidasResult<()> {
        let dirpath = path
            .parent()
            .ok_or_else(|| CurtidasError::config_error("Config path has no parent".into()))?
            .to_path_buf();
        self.dirpath = dirpath;
        self.filepath = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trip() {
        let tmp_dir = std::env::temp_dir().join("curtidas-config-test");
        let mut config = CurtidasConfig::default();
        config
            .set_filepath(tmp_dir.join(CONFIG_FILE))
            .expect("Error building test config");
        config.base_url = "http://10.0.0.2:9000".into();
        config.failure_banner_ms = 1234;

        config.save().unwrap();
        let loaded = CurtidasConfig::from_file(&config.filepath).unwrap();

        assert_eq!(loaded.base_url, "http://10.0.0.2:9000");
        assert_eq!(loaded.failure_banner_ms, 1234);
        assert_eq!(loaded.home_redirect, REDIRECT_HOME);
        assert_eq!(loaded.filepath, config.filepath);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            CurtidasConfig::load_or_default(Path::new("/nonexistent/curtidas.toml")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.success_banner_ms, SUCCESS_BANNER_MS);
    }
}
