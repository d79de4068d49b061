use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::dates::{DisplayTz, DEFAULT_OFFSET_HOURS};
use crate::upstream::{CachePolicy, RetryPolicy};
use crate::weeks::WeekNumbering;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3050";
const DEFAULT_SPARKLINE_WEEKS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub upstream_base_url: Url,
    pub display_tz: DisplayTz,
    pub numbering: WeekNumbering,
    pub sparkline_weeks: usize,
    pub retry: RetryPolicy,
    pub cache: CachePolicy,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_url = get("UPSTREAM_BASE_URL").ok_or(ConfigError::Missing("UPSTREAM_BASE_URL"))?;
        let upstream_base_url = match Url::parse(&raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => url,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "UPSTREAM_BASE_URL",
                    value: raw_url,
                })
            }
        };

        let bind_addr = parse_or(get("DASHBOARD_BIND_ADDR"), "DASHBOARD_BIND_ADDR", || {
            SocketAddr::from_str(DEFAULT_BIND_ADDR).map_err(|_| ConfigError::Invalid {
                var: "DASHBOARD_BIND_ADDR",
                value: DEFAULT_BIND_ADDR.to_string(),
            })
        })?;

        let offset_hours: i32 = parse_or(get("DISPLAY_UTC_OFFSET_HOURS"), "DISPLAY_UTC_OFFSET_HOURS", || {
            Ok(DEFAULT_OFFSET_HOURS)
        })?;
        let display_tz = DisplayTz::from_hours(offset_hours).ok_or_else(|| ConfigError::Invalid {
            var: "DISPLAY_UTC_OFFSET_HOURS",
            value: offset_hours.to_string(),
        })?;

        let numbering = match get("WEEK_NUMBERING") {
            None => WeekNumbering::default(),
            Some(raw) => WeekNumbering::parse(&raw).ok_or(ConfigError::Invalid {
                var: "WEEK_NUMBERING",
                value: raw,
            })?,
        };

        let sparkline_weeks = parse_or(get("SPARKLINE_WEEKS"), "SPARKLINE_WEEKS", || Ok(DEFAULT_SPARKLINE_WEEKS))?;

        let defaults = RetryPolicy::default();
        let max_attempts: u32 = parse_or(get("RETRY_MAX_ATTEMPTS"), "RETRY_MAX_ATTEMPTS", || {
            Ok(defaults.max_attempts)
        })?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "RETRY_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let base_ms: u64 = parse_or(get("RETRY_BASE_DELAY_MS"), "RETRY_BASE_DELAY_MS", || {
            Ok(defaults.base_delay.as_millis() as u64)
        })?;
        let max_ms: u64 = parse_or(get("RETRY_MAX_DELAY_MS"), "RETRY_MAX_DELAY_MS", || {
            Ok(defaults.max_delay.as_millis() as u64)
        })?;

        let cache_defaults = CachePolicy::default();
        let secs = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            parse_or(get(var), var, || Ok(default.as_secs())).map(Duration::from_secs)
        };
        let max_entries: usize = parse_or(get("CACHE_MAX_ENTRIES"), "CACHE_MAX_ENTRIES", || {
            Ok(cache_defaults.max_entries)
        })?;
        if max_entries == 0 {
            return Err(ConfigError::Invalid {
                var: "CACHE_MAX_ENTRIES",
                value: "0".to_string(),
            });
        }
        let cache = CachePolicy {
            chart: secs("CACHE_CHART_SECS", cache_defaults.chart)?,
            detail: secs("CACHE_DETAIL_SECS", cache_defaults.detail)?,
            leaderboard: secs("CACHE_LEADERBOARD_SECS", cache_defaults.leaderboard)?,
            today_count: secs("CACHE_TODAY_COUNT_SECS", cache_defaults.today_count)?,
            max_entries,
        };

        Ok(Self {
            bind_addr,
            upstream_base_url,
            display_tz,
            numbering,
            sparkline_weeks,
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(max_ms.max(base_ms)),
            },
            cache,
        })
    }
}

fn parse_or<T, D>(raw: Option<String>, var: &'static str, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match raw {
        None => default(),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("UPSTREAM_BASE_URL", "http://localhost:4000")]).unwrap();
        assert_eq!(config.bind_addr.port(), 3050);
        assert_eq!(config.display_tz.offset_hours(), 9);
        assert_eq!(config.numbering, WeekNumbering::OneBased);
        assert_eq!(config.sparkline_weeks, 4);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.cache, CachePolicy::default());
        assert_eq!(config.upstream_base_url.as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_missing_upstream() {
        assert_eq!(config_from(&[]).unwrap_err(), ConfigError::Missing("UPSTREAM_BASE_URL"));
        assert_eq!(
            config_from(&[("UPSTREAM_BASE_URL", "   ")]).unwrap_err(),
            ConfigError::Missing("UPSTREAM_BASE_URL")
        );
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("UPSTREAM_BASE_URL", "https://api.example.com"),
            ("DASHBOARD_BIND_ADDR", "127.0.0.1:8080"),
            ("DISPLAY_UTC_OFFSET_HOURS", "-5"),
            ("WEEK_NUMBERING", "lead_in_zero"),
            ("SPARKLINE_WEEKS", "6"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("RETRY_BASE_DELAY_MS", "200"),
            ("RETRY_MAX_DELAY_MS", "800"),
            ("CACHE_CHART_SECS", "0"),
            ("CACHE_LEADERBOARD_SECS", "5"),
            ("CACHE_MAX_ENTRIES", "64"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.display_tz.offset_hours(), -5);
        assert_eq!(config.numbering, WeekNumbering::LeadInZero);
        assert_eq!(config.sparkline_weeks, 6);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(200));
        assert_eq!(config.retry.max_delay, Duration::from_millis(800));
        assert_eq!(config.cache.chart, Duration::ZERO);
        assert_eq!(config.cache.leaderboard, Duration::from_secs(5));
        assert_eq!(config.cache.detail, CachePolicy::default().detail);
        assert_eq!(config.cache.max_entries, 64);
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("UPSTREAM_BASE_URL", "http://x"), ("WEEK_NUMBERING", "zero")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "WEEK_NUMBERING",
                value: "zero".into()
            }
        );

        let err = config_from(&[("UPSTREAM_BASE_URL", "http://x"), ("DISPLAY_UTC_OFFSET_HOURS", "99")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DISPLAY_UTC_OFFSET_HOURS", .. }));

        let err = config_from(&[("UPSTREAM_BASE_URL", "ftp://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "UPSTREAM_BASE_URL", .. }));

        let err = config_from(&[("UPSTREAM_BASE_URL", "http://")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "UPSTREAM_BASE_URL", .. }));

        let err = config_from(&[("UPSTREAM_BASE_URL", "http://x"), ("RETRY_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RETRY_MAX_ATTEMPTS", .. }));

        let err = config_from(&[("UPSTREAM_BASE_URL", "http://x"), ("CACHE_MAX_ENTRIES", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CACHE_MAX_ENTRIES", .. }));

        let err = config_from(&[("UPSTREAM_BASE_URL", "http://x"), ("CACHE_CHART_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CACHE_CHART_SECS", .. }));
    }
}
