//! Environment-backed runtime configuration for `client-smoke`.

use std::{env, path::PathBuf, time::Duration};

use client_core::{
    ChannelConfig, ExitConfirmationConfig, NotificationTiming, PagingConfig,
    channel::{DEFAULT_CAPACITY, DEFAULT_DISPLAY, DEFAULT_GAP},
    exit_confirm::{DEFAULT_EXIT_DEBOUNCE, DEFAULT_EXIT_TIMEOUT},
    paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};
use thiserror::Error;

const DEFAULT_CACHE_PATH: &str = "./.market-client/articles.json";
const UNBOUNDED: &str = "unbounded";

/// Runtime configuration used by the smoke client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub paging: PagingConfig,
    pub channel: ChannelConfig,
    pub exit: ExitConfirmationConfig,
    /// Location of the local article cache file.
    pub cache_path: PathBuf,
    /// Optional search filter applied to the article listing.
    pub search_query: Option<String>,
}

impl ClientConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let page_size = parse_u32("MARKET_PAGE_SIZE", DEFAULT_PAGE_SIZE, &mut lookup)?;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidValue {
                key: "MARKET_PAGE_SIZE",
                value: page_size.to_string(),
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        let display = parse_millis("MARKET_NOTIFY_DISPLAY_MS", DEFAULT_DISPLAY, &mut lookup)?;
        let gap = parse_millis("MARKET_NOTIFY_GAP_MS", DEFAULT_GAP, &mut lookup)?;
        let capacity = parse_capacity("MARKET_NOTIFY_CAPACITY", &mut lookup)?;

        let timeout = parse_millis("MARKET_EXIT_TIMEOUT_MS", DEFAULT_EXIT_TIMEOUT, &mut lookup)?;
        let debounce =
            parse_millis("MARKET_EXIT_DEBOUNCE_MS", DEFAULT_EXIT_DEBOUNCE, &mut lookup)?;
        if debounce >= timeout {
            return Err(ConfigError::InvalidValue {
                key: "MARKET_EXIT_DEBOUNCE_MS",
                value: debounce.as_millis().to_string(),
                reason: "must be shorter than MARKET_EXIT_TIMEOUT_MS".to_owned(),
            });
        }

        let cache_path = optional_trimmed_env("MARKET_CACHE_PATH", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));
        let search_query = optional_trimmed_env("MARKET_SEARCH_QUERY", &mut lookup);

        Ok(Self {
            paging: PagingConfig::new(page_size),
            channel: ChannelConfig {
                capacity,
                timing: NotificationTiming { display, gap },
            },
            exit: ExitConfirmationConfig { timeout, debounce },
            cache_path,
            search_query,
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_u32<F>(key: &'static str, default: u32, lookup: &mut F) -> Result<u32, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value.parse::<u32>().map_err(|err| ConfigError::InvalidValue {
        key,
        value,
        reason: err.to_string(),
    })
}

fn parse_millis<F>(
    key: &'static str,
    default: Duration,
    lookup: &mut F,
) -> Result<Duration, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

/// `unbounded` disables the cap; any other value must be a positive count.
fn parse_capacity<F>(key: &'static str, lookup: &mut F) -> Result<Option<usize>, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(Some(DEFAULT_CAPACITY));
    };
    if value.eq_ignore_ascii_case(UNBOUNDED) {
        return Ok(None);
    }
    match value.parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: format!("must be at least 1 or '{UNBOUNDED}'"),
        }),
        Ok(capacity) => Ok(Some(capacity)),
        Err(err) => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_client_behavior() {
        let cfg = config_from_pairs(&[]).expect("empty environment should parse");

        assert_eq!(cfg.paging, PagingConfig::default());
        assert_eq!(cfg.channel, ChannelConfig::default());
        assert_eq!(cfg.exit, ExitConfirmationConfig::default());
        assert_eq!(cfg.cache_path, PathBuf::from(DEFAULT_CACHE_PATH));
        assert_eq!(cfg.search_query, None);
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from_pairs(&[
            ("MARKET_PAGE_SIZE", "25"),
            ("MARKET_NOTIFY_DISPLAY_MS", "1500"),
            ("MARKET_NOTIFY_GAP_MS", "200"),
            ("MARKET_NOTIFY_CAPACITY", "unbounded"),
            ("MARKET_EXIT_TIMEOUT_MS", "3000"),
            ("MARKET_EXIT_DEBOUNCE_MS", "50"),
            ("MARKET_CACHE_PATH", "/tmp/market/articles.json"),
            ("MARKET_SEARCH_QUERY", "  rust  "),
        ])
        .expect("config should parse");

        assert_eq!(cfg.paging.page_size, 25);
        assert_eq!(cfg.channel.timing.display, Duration::from_millis(1_500));
        assert_eq!(cfg.channel.timing.gap, Duration::from_millis(200));
        assert_eq!(cfg.channel.capacity, None);
        assert_eq!(cfg.exit.timeout, Duration::from_secs(3));
        assert_eq!(cfg.exit.debounce, Duration::from_millis(50));
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/market/articles.json"));
        assert_eq!(cfg.search_query.as_deref(), Some("rust"));
    }

    #[test]
    fn blank_search_query_is_ignored() {
        let cfg = config_from_pairs(&[("MARKET_SEARCH_QUERY", "   ")]).expect("should parse");
        assert_eq!(cfg.search_query, None);
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let err = config_from_pairs(&[("MARKET_PAGE_SIZE", "0")])
            .expect_err("zero page size should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MARKET_PAGE_SIZE",
                ..
            }
        ));

        assert!(config_from_pairs(&[("MARKET_PAGE_SIZE", "101")]).is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = config_from_pairs(&[("MARKET_NOTIFY_CAPACITY", "0")])
            .expect_err("zero capacity should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MARKET_NOTIFY_CAPACITY",
                ..
            }
        ));
    }

    #[test]
    fn rejects_debounce_not_shorter_than_timeout() {
        let err = config_from_pairs(&[
            ("MARKET_EXIT_TIMEOUT_MS", "100"),
            ("MARKET_EXIT_DEBOUNCE_MS", "100"),
        ])
        .expect_err("debounce must be shorter");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MARKET_EXIT_DEBOUNCE_MS",
                ..
            }
        ));
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let err = config_from_pairs(&[("MARKET_NOTIFY_GAP_MS", "soon")])
            .expect_err("invalid gap value should fail");

        assert_eq!(
            err.to_string(),
            "invalid MARKET_NOTIFY_GAP_MS='soon': invalid digit found in string"
        );
    }
}
