//! `workshop.toml` loading and resolution against command-line overrides.
//!
//! Precedence is command line, then the config file, then built-in defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "workshop.toml";
pub const DEFAULT_BACKEND: &str = "sqlite";
pub const DEFAULT_CONNECTION_STRING: &str = "workshop.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{}' not found", .0.display())]
    Missing(PathBuf),

    #[error("cannot read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub backend: Option<String>,
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// The file as written; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: DatabaseSection,
    pub logging: LoggingSection,
}

impl FileConfig {
    pub fn parse(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` when given, otherwise [`DEFAULT_CONFIG_PATH`].
    ///
    /// A missing file at the default path yields an empty config. A missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if explicit {
                    Err(ConfigError::Missing(path.to_path_buf()))
                } else {
                    Ok(Self::default())
                }
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Which storage backend to open, and how.
///
/// | backend    | connection_string examples          |
/// |------------|-------------------------------------|
/// | `sqlite`   | `workshop.db`, `:memory:`           |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Lowercase backend name.
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    /// The seeded in-memory demo workshop.
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub backend: Option<String>,
    pub connection_string: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db: DbConfig,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(
        file: FileConfig,
        overrides: Overrides,
    ) -> Self {
        let backend = overrides
            .backend
            .or(file.database.backend)
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let connection_string = overrides
            .connection_string
            .or(file.database.connection_string)
            .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_string());
        let log_level = overrides
            .log_level
            .or(file.logging.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Self {
            db: DbConfig {
                backend: backend.trim().to_lowercase(),
                connection_string,
            },
            log_level,
            log_file: file.logging.file,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const FULL: &str = r#"
[database]
backend = "sqlite"
connection_string = "garage.db"

[logging]
level = "debug"
file = "workshop.log"
"#;

    fn parse(text: &str) -> FileConfig {
        FileConfig::parse(text, Path::new("test.toml")).expect("config should parse")
    }

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let settings = Settings::resolve(parse(""), Overrides::default());

        assert_eq!(
            settings,
            Settings {
                db: DbConfig {
                    backend: "sqlite".to_string(),
                    connection_string: "workshop.db".to_string(),
                },
                log_level: "info".to_string(),
                log_file: None,
            }
        );
    }

    #[test]
    fn default_db_config_is_in_memory_sqlite() {
        let config = DbConfig::default();

        assert_eq!(config.backend, "sqlite");
        assert_eq!(config.connection_string, ":memory:");
    }

    #[test]
    fn file_values_are_used() {
        let settings = Settings::resolve(parse(FULL), Overrides::default());

        assert_eq!(settings.db.connection_string, "garage.db");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_file, Some(PathBuf::from("workshop.log")));
    }

    #[test]
    fn command_line_beats_file() {
        let overrides = Overrides {
            backend: Some(" SQLite ".to_string()),
            connection_string: Some(":memory:".to_string()),
            log_level: Some("warn".to_string()),
        };

        let settings = Settings::resolve(parse(FULL), overrides);

        assert_eq!(settings.db.backend, "sqlite");
        assert_eq!(settings.db.connection_string, ":memory:");
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.log_file, Some(PathBuf::from("workshop.log")));
    }

    #[test]
    fn partial_sections_are_allowed() {
        let config = parse("[logging]\nlevel = \"trace\"\n");

        assert_eq!(config.database, DatabaseSection::default());
        assert_eq!(config.logging.level.as_deref(), Some("trace"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = FileConfig::parse("[database]\nurl = \"x\"\n", Path::new("bad.toml"));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = Path::new("definitely/not/here/workshop.toml");

        let err = FileConfig::load(Some(path)).expect_err("missing file should fail");

        assert_eq!(
            err.to_string(),
            "config file 'definitely/not/here/workshop.toml' not found"
        );
    }

    #[test]
    fn explicit_file_is_read() {
        let path = std::env::temp_dir().join(format!("workshop-cli-{}.toml", std::process::id()));
        fs::write(&path, FULL).expect("should write temp config");

        let config = FileConfig::load(Some(&path));
        let _ = fs::remove_file(&path);

        assert_eq!(
            config.expect("config should load").database.connection_string,
            Some("garage.db".to_string())
        );
    }
}
