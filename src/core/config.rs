use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Refresh interval used when the config does not set `currency_refresh`.
pub const DEFAULT_REFRESH_MINUTES: u64 = 10;

/// Per-request timeout applied to every outbound ticker call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// One upstream provider of a single currency's rate.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
    /// Dotted path to the rate inside the JSON body, e.g. `last`.
    pub path: String,
}

impl SourceSpec {
    pub fn new(name: &str, url: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CurrencySources {
    pub currency: String,
    pub sources: Vec<SourceSpec>,
}

pub fn default_sources() -> Vec<CurrencySources> {
    vec![
        CurrencySources {
            currency: "USD".to_string(),
            sources: vec![SourceSpec::new(
                "Bitstamp",
                "https://www.bitstamp.net/api/v2/ticker/btcusd",
                "last",
            )],
        },
        CurrencySources {
            currency: "EUR".to_string(),
            sources: vec![SourceSpec::new(
                "Bitstamp",
                "https://www.bitstamp.net/api/v2/ticker/btceur",
                "last",
            )],
        },
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Minutes between refresh passes.
    pub currency_refresh: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_sources")]
    pub sources: Vec<CurrencySources>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            currency_refresh: None,
            request_timeout_secs: None,
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "xrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// A `currency_refresh` of 0 counts as unset.
    pub fn refresh_minutes(&self) -> u64 {
        self.currency_refresh
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_REFRESH_MINUTES)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.sources {
            if entry.currency.trim().is_empty() {
                bail!("Currency code must not be empty");
            }
            if entry.sources.is_empty() {
                bail!("Currency {} has no sources configured", entry.currency);
            }
            for (i, source) in entry.sources.iter().enumerate() {
                if entry.sources[..i].iter().any(|s| s.name == source.name) {
                    bail!(
                        "Currency {} has more than one source named {}",
                        entry.currency,
                        source.name
                    );
                }
                if source.name.trim().is_empty()
                    || source.url.trim().is_empty()
                    || source.path.trim().is_empty()
                {
                    bail!(
                        "Source for {} needs a name, url and path: {:?}",
                        entry.currency,
                        source
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency_refresh: 5
request_timeout_secs: 3
sources:
  - currency: USD
    sources:
      - name: Bitstamp
        url: "https://www.bitstamp.net/api/v2/ticker/btcusd"
        path: last
      - name: Bitcoin.com
        url: "https://index.bitcoin.com/api/v0/price/usd"
        path: price
  - currency: EUR
    sources:
      - name: Bitstamp
        url: "https://www.bitstamp.net/api/v2/ticker/btceur"
        path: last
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.refresh_minutes(), 5);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(3));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].currency, "USD");
        assert_eq!(config.sources[0].sources.len(), 2);
        assert_eq!(config.sources[0].sources[1].name, "Bitcoin.com");
        assert_eq!(config.sources[0].sources[1].path, "price");
        assert_eq!(config.sources[1].currency, "EUR");
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.refresh_minutes(), DEFAULT_REFRESH_MINUTES);
        assert_eq!(
            config.request_timeout(),
            std::time::Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(config.sources, default_sources());
    }

    #[test]
    fn test_zero_refresh_falls_back_to_default() {
        let config = AppConfig::from_yaml("currency_refresh: 0").unwrap();
        assert_eq!(config.refresh_minutes(), DEFAULT_REFRESH_MINUTES);
    }

    #[test]
    fn test_config_rejects_duplicate_source_names() {
        let yaml_str = r#"
sources:
  - currency: USD
    sources:
      - name: Bitstamp
        url: "https://www.bitstamp.net/api/v2/ticker/btcusd"
        path: last
      - name: Bitstamp
        url: "https://www.bitstamp.net/api/v2/ticker/btcusd"
        path: bid
  - currency: EUR
    sources:
      - name: Bitstamp
        url: "https://www.bitstamp.net/api/v2/ticker/btceur"
        path: last
"#;
        let result = AppConfig::from_yaml(yaml_str);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Currency USD has more than one source named Bitstamp"
        );
    }

    #[test]
    fn test_config_rejects_incomplete_source() {
        let yaml_str = r#"
sources:
  - currency: USD
    sources:
      - name: Bitstamp
        url: ""
        path: last
"#;
        let result = AppConfig::from_yaml(yaml_str);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("needs a name, url and path"));
    }

    #[test]
    fn test_config_rejects_currency_without_sources() {
        let yaml_str = r#"
sources:
  - currency: GBP
    sources: []
"#;
        let result = AppConfig::from_yaml(yaml_str);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Currency GBP has no sources configured"
        );
    }
}
