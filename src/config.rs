use crate::i18n::Language;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime settings, read from `DOCENT_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub timeout: Duration,
    pub language: Language,
    pub log_level: String,
    pub export_dir: PathBuf,
}

impl Config {
    /// Reads the process environment, falling back to `defaults` in `.env`
    /// syntax for keys the environment leaves unset or blank.
    pub fn from_env_with_defaults(defaults: &str) -> Result<Self> {
        Self::layered(|key| env::var(key).ok(), defaults)
    }

    fn layered(lookup: impl Fn(&str) -> Option<String>, defaults: &str) -> Result<Self> {
        let defaults: HashMap<String, String> = dotenvy::from_read_iter(defaults.as_bytes())
            .collect::<Result<_, _>>()
            .context("parsing bundled defaults")?;
        Self::from_lookup(|key| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .or_else(|| defaults.get(key).cloned())
        })
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = get("DOCENT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match get("DOCENT_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("DOCENT_TIMEOUT_SECS must be whole seconds, got {raw:?}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let language = match get("DOCENT_LANGUAGE") {
            Some(raw) => raw.parse::<Language>().context("DOCENT_LANGUAGE")?,
            None => Language::default(),
        };

        let log_level = get("DOCENT_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let export_dir = get("DOCENT_EXPORT_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            language,
            log_level,
            export_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.language, Language::En);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DOCENT_API_URL", "https://learn.example.com"),
            ("DOCENT_TIMEOUT_SECS", " 15 "),
            ("DOCENT_LANGUAGE", "vi"),
            ("DOCENT_EXPORT_DIR", "/tmp/exports"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://learn.example.com");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.language, Language::Vi);
        assert_eq!(config.export_dir, PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn blank_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("DOCENT_API_URL", "  ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn bundled_defaults_fill_unset_keys() {
        let bundled = "\
# shipped defaults
DOCENT_API_URL=http://docs.internal:9000
DOCENT_LANGUAGE=vi
";
        let config = Config::layered(
            lookup(&[("DOCENT_LANGUAGE", "en"), ("DOCENT_API_URL", " ")]),
            bundled,
        )
        .unwrap();
        assert_eq!(config.api_url, "http://docs.internal:9000");
        assert_eq!(config.language, Language::En);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("DOCENT_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DOCENT_LANGUAGE", "fr")])).is_err());
    }
}
