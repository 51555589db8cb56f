use crate::constants;
use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use std::env;

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
    /// Origin embedded in QR tracking URLs
    pub public_origin: String,
    pub simulated_latency_ms: u64,
    pub simulated_failure_rate: f64,
    pub report_timezone: Tz,
    pub export_rate_limit_per_minute: u32,
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_SERVER_HOST.to_string(),
            port: constants::DEFAULT_SERVER_PORT,
            cors_origins: "*".to_string(),
            public_origin: constants::DEFAULT_PUBLIC_ORIGIN.to_string(),
            simulated_latency_ms: constants::DEFAULT_SIMULATED_LATENCY_MS,
            simulated_failure_rate: constants::DEFAULT_SIMULATED_FAILURE_RATE,
            report_timezone: Tz::UTC,
            export_rate_limit_per_minute: constants::DEFAULT_EXPORT_RATE_LIMIT_PER_MINUTE,
            seed_demo_data: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("SERVER_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("Invalid SERVER_PORT: {v}"))?,
            None => defaults.port,
        };

        let simulated_failure_rate = match lookup("SIMULATED_FAILURE_RATE") {
            Some(v) => v
                .parse::<f64>()
                .with_context(|| format!("Invalid SIMULATED_FAILURE_RATE: {v}"))?,
            None => defaults.simulated_failure_rate,
        };
        if !(0.0..=1.0).contains(&simulated_failure_rate) {
            bail!("SIMULATED_FAILURE_RATE must be between 0.0 and 1.0, got {simulated_failure_rate}");
        }

        let report_timezone = match lookup("REPORT_TIMEZONE") {
            Some(v) => v
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid REPORT_TIMEZONE '{v}': {e}"))?,
            None => defaults.report_timezone,
        };

        let public_origin = lookup("PUBLIC_ORIGIN")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_origin);

        Ok(Self {
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port,
            cors_origins: lookup("CORS_ORIGINS").unwrap_or(defaults.cors_origins),
            public_origin,
            simulated_latency_ms: lookup("SIMULATED_LATENCY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.simulated_latency_ms),
            simulated_failure_rate,
            report_timezone,
            export_rate_limit_per_minute: lookup("EXPORT_RATE_LIMIT_PER_MINUTE")
                .and_then(|v| v.parse().ok())
                .filter(|v: &u32| *v > 0)
                .unwrap_or(defaults.export_rate_limit_per_minute),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.seed_demo_data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, constants::DEFAULT_SERVER_PORT);
        assert_eq!(config.report_timezone, Tz::UTC);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("SERVER_PORT", "8080"),
            ("PUBLIC_ORIGIN", "https://trace.example.com/"),
            ("REPORT_TIMEZONE", "Asia/Bangkok"),
            ("SIMULATED_LATENCY_MS", "0"),
            ("SEED_DEMO_DATA", "false"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_origin, "https://trace.example.com");
        assert_eq!(config.report_timezone, chrono_tz::Asia::Bangkok);
        assert_eq!(config.simulated_latency_ms, 0);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("SERVER_PORT", "eighty")]).is_err());
        assert!(config_from(&[("REPORT_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(config_from(&[("SIMULATED_FAILURE_RATE", "1.5")]).is_err());
    }
}
