//! Application configuration loaded from `config.toml`.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use qk_consolidate::ConsolidateOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;

/// Application-wide configuration.
///
/// ```toml
/// [consolidate]
/// output_file_name = "pak0.pak"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub consolidate: ConsolidateOptions,
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Load the configuration.
///
/// An explicit `path` must exist. Without one, `config.toml` next to the
/// executable is used if present; otherwise defaults apply.
pub fn load_config(path: Option<&Utf8Path>) -> Result<AppConfig, CliError> {
    match path {
        Some(path) => match read_config(path)? {
            Some(cfg) => Ok(cfg),
            None => Err(CliError::config_not_found(path.to_path_buf())),
        },
        None => match default_config_path() {
            Some(path) => Ok(read_config(&path)?.unwrap_or_default()),
            None => Ok(AppConfig::default()),
        },
    }
}

/// Parse the config at `path`, returning `Ok(None)` if the file does not exist.
fn read_config(path: &Utf8Path) -> Result<Option<AppConfig>, CliError> {
    let content = match fs::read_to_string(path.as_std_path()) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CliError::io_error(path.to_path_buf(), e)),
    };

    tracing::debug!("Loading config from {}", path);
    toml::from_str(&content)
        .map(Some)
        .map_err(|e| CliError::config_parse_error(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(content: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let (_dir, path) = temp_config("[consolidate]\noutput_file_name = \"pak5.pak\"\n");
        let cfg = load_config(Some(&path)).unwrap();

        assert_eq!(cfg.consolidate.output_file_name, "pak5.pak");
        assert_eq!(cfg.consolidate.staging_suffix, "_temp");
    }

    #[test]
    fn empty_file_is_default() {
        let (_dir, path) = temp_config("");
        assert_eq!(load_config(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nope.toml")).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn malformed_config_is_parse_error() {
        let (_dir, path) = temp_config("[consolidate\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::ConfigParseError { .. })
        ));
    }
}
