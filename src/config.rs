use std::time::Duration;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api_version: String,
    pub client_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("PORT").unwrap_or_else(|_| "8000".into());
        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET")?,
            access_ttl: env_duration("JWT_ACCESS_EXPIRES", "1h")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET")?,
            refresh_ttl: env_duration("JWT_REFRESH_EXPIRES", "14d")?,
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?,
            api_version: normalize_prefix(
                &std::env::var("API_VERSION").unwrap_or_else(|_| "/api/v1".into()),
            ),
            client_url: std::env::var("CLIENT_URL").unwrap_or_default(),
            jwt,
        })
    }
}

const MIN_TOKEN_TTL: Duration = Duration::from_secs(1);
// 10 years of 365.25 days, matching the "y" unit below
const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 31_557_600);

fn env_duration(key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    parse_token_ttl(&raw).with_context(|| format!("{key} is not a valid token lifetime: {raw:?}"))
}

/// Token lifetimes are whole seconds on the wire; anything under a second
/// would mint already-expired tokens.
fn parse_token_ttl(raw: &str) -> anyhow::Result<Duration> {
    let ttl = parse_duration(raw)?;
    if ttl < MIN_TOKEN_TTL {
        anyhow::bail!("must be at least 1s");
    }
    if ttl > MAX_TOKEN_TTL {
        anyhow::bail!("must be at most 10 years");
    }
    Ok(ttl)
}

/// "/api/v1/" and "api/v1" both become "/api/v1"; an empty value mounts at the root.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Parses durations written like "15m", "7d", "2 hours" or "1500".
///
/// A number without a unit is milliseconds.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    lazy_static! {
        static ref DURATION_RE: Regex = Regex::new(
            r"(?i)^(\d+(?:\.\d+)?|\.\d+) *(milliseconds?|msecs?|ms|seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w|years?|yrs?|y)?$"
        )
        .unwrap();
    }

    let caps = DURATION_RE
        .captures(raw.trim())
        .ok_or_else(|| anyhow::anyhow!("unrecognized duration"))?;
    let value: f64 = caps[1].parse()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "ms".into());

    let millis_per_unit = match unit.as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "week" | "weeks" => 604_800_000.0,
        // 365.25 days
        _ => 31_557_600_000.0,
    };

    let millis = value * millis_per_unit;
    if !millis.is_finite() || millis > u64::MAX as f64 {
        anyhow::bail!("duration out of range");
    }
    Ok(Duration::from_millis(millis.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_units() {
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(7 * 86_400));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
    }

    #[test]
    fn parses_long_units_and_spaces() {
        assert_eq!(parse_duration("2 hours").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("1 Day").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5_400));
    }

    #[test]
    fn bare_number_is_milliseconds() {
        assert_eq!(parse_duration("1500").unwrap(), Duration::from_millis(1_500));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("10 fortnights").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn token_ttl_must_be_sane() {
        assert_eq!(parse_token_ttl("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_token_ttl("14d").unwrap(), Duration::from_secs(14 * 86_400));
        assert!(parse_token_ttl("500").is_err());
        assert!(parse_token_ttl("0s").is_err());
        assert!(parse_token_ttl("10y").is_ok());
        assert!(parse_token_ttl("11y").is_err());
        assert!(parse_token_ttl("99999999999999999999999y").is_err());
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("api/v2/"), "/api/v2");
        assert_eq!(normalize_prefix("/"), "");
    }
}
