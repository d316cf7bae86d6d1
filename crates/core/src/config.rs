use std::{str::FromStr, time::Duration};

use crate::error::{Result, VidquizError};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Policy knobs for planning and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Spacing between numeric trigger times, in seconds.
    pub boundary_interval_secs: f64,
    pub points_per_correct_answer: u32,
    /// Cadence at which the playback clock is sampled.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            boundary_interval_secs: 600.0,
            points_per_correct_answer: 10,
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VidquizConfig {
    pub scheduler: SchedulerConfig,
    pub service: ServiceConfig,
}

impl VidquizConfig {
    pub const ENV_BOUNDARY_INTERVAL: &'static str = "VIDQUIZ_BOUNDARY_INTERVAL_SECS";
    pub const ENV_POINTS_PER_ANSWER: &'static str = "VIDQUIZ_POINTS_PER_ANSWER";
    pub const ENV_TICK_MS: &'static str = "VIDQUIZ_TICK_MS";
    pub const ENV_SERVICE_URL: &'static str = "VIDQUIZ_SERVICE_URL";
    pub const ENV_REQUEST_TIMEOUT: &'static str = "VIDQUIZ_REQUEST_TIMEOUT_SECS";

    /// Load configuration from the process environment, keeping defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`VidquizConfig::from_env`] with an explicit key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_positive::<f64>(&lookup, Self::ENV_BOUNDARY_INTERVAL)? {
            config.scheduler.boundary_interval_secs = secs;
        }
        if let Some(points) = parse_positive::<u32>(&lookup, Self::ENV_POINTS_PER_ANSWER)? {
            config.scheduler.points_per_correct_answer = points;
        }
        if let Some(ms) = parse_positive::<u64>(&lookup, Self::ENV_TICK_MS)? {
            config.scheduler.tick_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_positive::<u64>(&lookup, Self::ENV_REQUEST_TIMEOUT)? {
            config.service.request_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup(Self::ENV_SERVICE_URL) {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                return Err(VidquizError::InvalidConfig {
                    key: Self::ENV_SERVICE_URL.to_string(),
                    value: url,
                });
            }
            config.service.base_url = url;
        }

        Ok(config)
    }
}

fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    let invalid = || VidquizError::InvalidConfig {
        key: key.to_string(),
        value: raw.clone(),
    };

    let value = raw.trim().parse::<T>().map_err(|_| invalid())?;
    // NaN fails this comparison too
    if !(value > T::default()) {
        return Err(invalid());
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_environment_keeps_defaults() {
        let config = VidquizConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, VidquizConfig::default());
        assert_eq!(config.scheduler.boundary_interval_secs, 600.0);
        assert_eq!(config.scheduler.points_per_correct_answer, 10);
        assert_eq!(config.service.base_url, DEFAULT_SERVICE_URL);
    }

    #[test]
    fn overrides_are_applied() {
        let config = VidquizConfig::from_lookup(lookup_from(&[
            (VidquizConfig::ENV_BOUNDARY_INTERVAL, "300"),
            (VidquizConfig::ENV_POINTS_PER_ANSWER, "5"),
            (VidquizConfig::ENV_TICK_MS, "250"),
            (VidquizConfig::ENV_SERVICE_URL, "http://quiz.local:8080/"),
        ]))
        .unwrap();

        assert_eq!(config.scheduler.boundary_interval_secs, 300.0);
        assert_eq!(config.scheduler.points_per_correct_answer, 5);
        assert_eq!(config.scheduler.tick_interval, Duration::from_millis(250));
        assert_eq!(config.service.base_url, "http://quiz.local:8080");
    }

    #[rstest]
    #[case(VidquizConfig::ENV_BOUNDARY_INTERVAL, "0")]
    #[case(VidquizConfig::ENV_BOUNDARY_INTERVAL, "-600")]
    #[case(VidquizConfig::ENV_BOUNDARY_INTERVAL, "NaN")]
    #[case(VidquizConfig::ENV_POINTS_PER_ANSWER, "ten")]
    #[case(VidquizConfig::ENV_TICK_MS, "0")]
    #[case(VidquizConfig::ENV_SERVICE_URL, "  ")]
    fn invalid_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        let err = VidquizConfig::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
        assert!(matches!(err, VidquizError::InvalidConfig { .. }), "{err}");
    }
}
