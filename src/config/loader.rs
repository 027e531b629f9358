//! Configuration loading from disk.
//!
//! Errors carry the file path, so a failed reload names the file that broke.
//! Command-line overrides live here as well: they are applied after every
//! load, at startup and on reload alike.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Validation {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

impl ConfigError {
    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Validation { path, .. } => path,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "cannot parse {}: {}", path.display(), source)
            }
            ConfigError::Validation { path, errors } => {
                write!(f, "{} failed validation: ", path.display())?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Validation { .. } => None,
        }
    }
}

/// Values given on the command line that win over the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `listener.port`.
    pub port: Option<u16>,
}

impl Overrides {
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GatewayConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(|errors| ConfigError::Validation {
        path: path.to_path_buf(),
        errors,
    })?;

    Ok(config)
}

/// [`load_config`], then apply `overrides`.
pub fn load_config_with(path: &Path, overrides: Overrides) -> Result<GatewayConfig, ConfigError> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_file() {
        let file = write_config(
            r#"
            [[services]]
            name = "svc-a"
            url = "http://127.0.0.1:9000"

            [[routes]]
            path = "^/"
            service = "svc-a"
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.services[0].name, "svc-a");
        assert_eq!(config.routes[0].path, "^/");
    }

    #[test]
    fn test_port_override() {
        let file = write_config("[listener]\nport = 8080\n");

        let config = load_config_with(file.path(), Overrides::default()).unwrap();
        assert_eq!(config.listener.port, 8080);

        let config = load_config_with(file.path(), Overrides { port: Some(9443) }).unwrap();
        assert_eq!(config.listener.port, 9443);
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/gatekeeper.toml");
        let err = load_config(path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(err.path(), path);
        assert!(err.to_string().starts_with("cannot read /nonexistent/gatekeeper.toml"));
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("[[routes]]\npath = 12\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error_lists_every_problem() {
        let file = write_config(
            r#"
            [[services]]
            name = "svc-a"
            url = "ftp://files.example.com"

            [[routes]]
            path = "(unclosed"
            service = "svc-a"
            "#,
        );

        let err = load_config(file.path()).unwrap_err();
        match &err {
            ConfigError::Validation { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
        assert_eq!(err.path(), file.path());
        assert!(err.to_string().contains("failed validation: "));
    }
}
