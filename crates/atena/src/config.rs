//! Settings read from the environment.

use std::env;
use std::path::PathBuf;

use atena_core::{Locale, UnknownLocale};

/// Server address used when `ATENA_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// The error type for [`Config::from_env`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `ATENA_DATA_DIR` is not set and the platform has no data directory.
    #[error("cannot find a data directory, set ATENA_DATA_DIR")]
    NoDataDir,
    /// `ATENA_LOCALE` names a language the client doesn't speak.
    #[error("invalid ATENA_LOCALE: {0}")]
    Locale(#[from] UnknownLocale),
}

/// Settings of the terminal client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Where the Atena server lives (`ATENA_BASE_URL`).
    pub base_url: String,
    /// Where conversations are saved (`ATENA_DATA_DIR`, by default
    /// `atena` inside the platform data directory).
    pub data_dir: PathBuf,
    /// The language of placeholders and errors (`ATENA_LOCALE`).
    pub locale: Locale,
}

impl Config {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`, which returns the value of an
    /// environment variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url =
            var("ATENA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let data_dir = match var("ATENA_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("atena"))
                .ok_or(ConfigError::NoDataDir)?,
        };
        let locale = match var("ATENA_LOCALE") {
            Some(tag) => tag.trim().parse()?,
            None => Locale::default(),
        };
        Ok(Self {
            base_url,
            data_dir,
            locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_explicit_settings() {
        let config = Config::from_lookup(lookup(&[
            ("ATENA_BASE_URL", "https://atena.example"),
            ("ATENA_DATA_DIR", "/tmp/atena-test"),
            ("ATENA_LOCALE", "pt-BR"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://atena.example");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/atena-test"));
        assert_eq!(config.locale, Locale::PtBr);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("ATENA_BASE_URL", "  "),
            ("ATENA_DATA_DIR", "/tmp/atena-test"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.locale, Locale::EsEs);
    }

    #[test]
    fn test_bad_locale() {
        let err = Config::from_lookup(lookup(&[
            ("ATENA_DATA_DIR", "/tmp/atena-test"),
            ("ATENA_LOCALE", "klingon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Locale(_)));
    }
}
