use crate::cli::Cli;
use crate::error::{ConsulRenderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global settings file, read when present.
pub const GLOBAL_SETTINGS_PATH: &str = "/etc/consul-render/config.toml";

pub const DEFINITION_DIR_ENV: &str = "CONSUL_RENDER_DEFINITION_DIR";
pub const SECRETS_DIR_ENV: &str = "CONSUL_RENDER_SECRETS_DIR";

/// Tool settings, distinct from the agent configuration being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub definitions: DefinitionSettings,
    pub secrets: SecretSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionSettings {
    /// Directory holding `<name>.json` definition files.
    pub directory: PathBuf,
}

impl Default for DefinitionSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/etc/consul"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretSettings {
    /// Root of the file-backed secret store.
    pub directory: PathBuf,
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/etc/consul-render/secrets"),
        }
    }
}

/// On-disk form of [`Settings`]: every key optional, so a file only
/// overrides what it mentions.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSnippet {
    definitions: Option<DirectorySnippet>,
    secrets: Option<DirectorySnippet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectorySnippet {
    directory: Option<PathBuf>,
}

impl Settings {
    /// Load settings with precedence:
    /// 1. CLI flags (applied later via with_cli_overrides)
    /// 2. Environment variables
    /// 3. Explicit settings file (`--settings`)
    /// 4. Global settings file
    /// 5. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(Path::new(GLOBAL_SETTINGS_PATH), explicit)
    }

    pub fn load_from(global: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();

        if global.exists() {
            settings.merge(Self::read_snippet(global)?);
        }

        if let Some(path) = explicit {
            settings.merge(Self::read_snippet(path)?);
        }

        settings.merge_env();
        Ok(settings)
    }

    fn read_snippet(path: &Path) -> Result<SettingsSnippet> {
        debug!(path = %path.display(), "reading settings");
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConsulRenderError::filesystem(path, e))?;
        Ok(toml::from_str(&contents)?)
    }

    fn merge(&mut self, snippet: SettingsSnippet) {
        if let Some(directory) = snippet.definitions.and_then(|d| d.directory) {
            self.definitions.directory = directory;
        }
        if let Some(directory) = snippet.secrets.and_then(|s| s.directory) {
            self.secrets.directory = directory;
        }
    }

    fn merge_env(&mut self) {
        if let Some(dir) = non_empty_env(DEFINITION_DIR_ENV) {
            self.definitions.directory = dir;
        }
        if let Some(dir) = non_empty_env(SECRETS_DIR_ENV) {
            self.secrets.directory = dir;
        }
    }

    /// The effective settings as a TOML document.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply CLI overrides (highest precedence)
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.definition_dir {
            self.definitions.directory = dir.clone();
        }
        if let Some(dir) = &cli.secrets_dir {
            self.secrets.directory = dir.clone();
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var(DEFINITION_DIR_ENV);
        std::env::remove_var(SECRETS_DIR_ENV);
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.definitions.directory, PathBuf::from("/etc/consul"));
        assert_eq!(
            settings.secrets.directory,
            PathBuf::from("/etc/consul-render/secrets")
        );
    }

    #[test]
    #[serial]
    fn test_missing_global_file_uses_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp.path().join("absent.toml"), None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    #[serial]
    fn test_explicit_file_overrides_global() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let global = write(
            &temp,
            "global.toml",
            "[definitions]\ndirectory = \"/srv/global\"\n\n[secrets]\ndirectory = \"/srv/secrets\"\n",
        );
        let explicit = write(&temp, "local.toml", "[definitions]\ndirectory = \"/srv/local\"\n");

        let settings = Settings::load_from(&global, Some(&explicit)).unwrap();
        assert_eq!(settings.definitions.directory, PathBuf::from("/srv/local"));
        assert_eq!(settings.secrets.directory, PathBuf::from("/srv/secrets"));
    }

    #[test]
    #[serial]
    fn test_explicit_file_must_exist() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let err = Settings::load_from(
            &temp.path().join("absent.toml"),
            Some(&temp.path().join("missing.toml")),
        )
        .unwrap_err();
        assert!(matches!(err, ConsulRenderError::Filesystem { .. }));
    }

    #[test]
    #[serial]
    fn test_unknown_keys_rejected() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let explicit = write(&temp, "bad.toml", "[definitions]\ndir = \"/srv\"\n");
        let err = Settings::load_from(&temp.path().join("absent.toml"), Some(&explicit))
            .unwrap_err();
        assert!(matches!(err, ConsulRenderError::SettingsParse(_)));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let explicit = write(&temp, "local.toml", "[secrets]\ndirectory = \"/srv/file\"\n");
        std::env::set_var(SECRETS_DIR_ENV, "/srv/env");

        let settings =
            Settings::load_from(&temp.path().join("absent.toml"), Some(&explicit)).unwrap();
        clear_env();

        assert_eq!(settings.secrets.directory, PathBuf::from("/srv/env"));
    }

    #[test]
    #[serial]
    fn test_empty_env_ignored() {
        clear_env();
        std::env::set_var(DEFINITION_DIR_ENV, "");
        let settings = Settings::load_from(Path::new("/nonexistent/config.toml"), None).unwrap();
        clear_env();

        assert_eq!(settings.definitions.directory, PathBuf::from("/etc/consul"));
    }

    #[test]
    fn test_to_toml_lists_both_directories() {
        let rendered = Settings::default().to_toml().unwrap();
        assert!(rendered.contains("[definitions]\ndirectory = \"/etc/consul\""));
        assert!(rendered.contains("[secrets]\ndirectory = \"/etc/consul-render/secrets\""));
    }

    #[test]
    #[serial]
    fn test_directory_flags_do_not_read_environment() {
        std::env::set_var(DEFINITION_DIR_ENV, "/srv/env");
        let cli = Cli::parse_from(["consul-render", "settings"]);
        clear_env();

        assert_eq!(cli.definition_dir, None);
        assert_eq!(cli.secrets_dir, None);
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "consul-render",
            "--definition-dir",
            "/srv/cli",
            "settings",
        ]);
        let mut settings = Settings::default();
        settings.definitions.directory = PathBuf::from("/srv/env");

        let settings = settings.with_cli_overrides(&cli);
        assert_eq!(settings.definitions.directory, PathBuf::from("/srv/cli"));
        assert_eq!(
            settings.secrets.directory,
            PathBuf::from("/etc/consul-render/secrets")
        );
    }
}
