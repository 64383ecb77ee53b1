use std::{env, str::FromStr, time::Duration};

use super::env::{
    AlertConfig, ApiConfig, AppConfig, ConfigError, DirectoryConfig, FeedConfig, LoggingConfig,
};

/// Added on top of the worst-case fetch so the alert for the last post can still go out.
const SHUTDOWN_SLACK: Duration = Duration::from_secs(15);

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

/// Reads variables through a lookup function so parsing does not depend on process state.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or_else(|| default.to_string())
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.raw(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.non_empty(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name: key, value: raw }),
            None => Ok(default),
        }
    }

    fn secs(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse_or(key, default).map(Duration::from_secs)
    }

    fn bool_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.non_empty(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name: key, value: raw }),
        }
    }
}

impl AppConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let sites_file = vars.or("SITES_FILE", "sites.txt");
        let rules_file = vars.non_empty("RULES_FILE");

        let feed = FeedConfig {
            url: vars.or("FEED_URL", FeedConfig::DEFAULT_URL),
            reconnect: vars.bool_or("FEED_RECONNECT", true)?,
            reconnect_delay: vars.secs("FEED_RECONNECT_DELAY_SECS", 5)?,
            connect_timeout: vars.secs("FEED_CONNECT_TIMEOUT_SECS", 30)?,
            idle_timeout: vars.secs("FEED_IDLE_TIMEOUT_SECS", 600)?,
        };

        let max_attempts = vars.parse_or("FETCH_MAX_ATTEMPTS", 6u32)?;
        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("FETCH_MAX_ATTEMPTS"));
        }
        let api = ApiConfig {
            base_url: vars
                .raw("SE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| ApiConfig::DEFAULT_BASE_URL.to_string()),
            api_key: vars.non_empty("SE_API_KEY"),
            max_attempts,
            retry_interval: vars.secs("FETCH_RETRY_INTERVAL_SECS", 10)?,
            request_timeout: vars.secs("FETCH_TIMEOUT_SECS", 30)?,
        };

        let alerts = AlertConfig {
            telegram_bot_token: vars.non_empty("TELEGRAM_BOT_TOKEN"),
            chat_id: vars
                .non_empty("ALERT_CHAT_ID")
                .map(|raw| {
                    raw.trim().parse::<i64>().map_err(|_| ConfigError::Invalid {
                        name: "ALERT_CHAT_ID",
                        value: raw,
                    })
                })
                .transpose()?,
        };

        let directories = DirectoryConfig {
            logs_dir: vars.or("LOGS_DIR", "logs"),
        };

        let logging = LoggingConfig {
            level: vars.or("LOG_LEVEL", "info"),
        };

        let shutdown_grace = match vars.non_empty("SHUTDOWN_GRACE_SECS") {
            Some(_) => vars.secs("SHUTDOWN_GRACE_SECS", 0)?,
            None => api.worst_case_fetch() + SHUTDOWN_SLACK,
        };

        Ok(Self {
            sites_file,
            rules_file,
            feed,
            api,
            alerts,
            directories,
            logging,
            shutdown_grace,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.sites_file, "sites.txt");
        assert!(config.rules_file.is_none());
        assert_eq!(config.feed.url, FeedConfig::DEFAULT_URL);
        assert!(config.feed.reconnect);
        assert_eq!(config.feed.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.api.base_url, ApiConfig::DEFAULT_BASE_URL);
        assert!(config.api.api_key.is_none());
        assert_eq!(config.api.max_attempts, 6);
        assert_eq!(config.api.retry_interval, Duration::from_secs(10));
        assert!(config.alerts.chat_id.is_none());
    }

    #[test]
    fn default_grace_outlasts_a_full_retry_sequence() {
        let config = load(&[]).unwrap();
        // 6 requests of up to 30s plus 5 sleeps of 10s
        assert_eq!(config.api.worst_case_fetch(), Duration::from_secs(230));
        assert!(config.shutdown_grace > config.api.worst_case_fetch());

        let config = load(&[("FETCH_MAX_ATTEMPTS", "2"), ("FETCH_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(config.shutdown_grace, Duration::from_secs(5 + 10 + 5) + SHUTDOWN_SLACK);

        let config = load(&[("SHUTDOWN_GRACE_SECS", "3")]).unwrap();
        assert_eq!(config.shutdown_grace, Duration::from_secs(3));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = load(&[("FETCH_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroAttempts("FETCH_MAX_ATTEMPTS")));
    }

    #[test]
    fn boolean_vocabulary() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(load(&[("FEED_RECONNECT", raw)]).unwrap().feed.reconnect, "{raw}");
        }
        for raw in ["0", "False", "no", "off"] {
            assert!(!load(&[("FEED_RECONNECT", raw)]).unwrap().feed.reconnect, "{raw}");
        }
        // blank falls back to the default
        assert!(load(&[("FEED_RECONNECT", "  ")]).unwrap().feed.reconnect);

        let err = load(&[("FEED_RECONNECT", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FEED_RECONNECT", ref value } if value == "maybe"));
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = load(&[("FETCH_RETRY_INTERVAL_SECS", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FETCH_RETRY_INTERVAL_SECS", .. }));

        let err = load(&[("ALERT_CHAT_ID", "@channel")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ALERT_CHAT_ID", .. }));
    }

    #[test]
    fn values_are_trimmed_and_normalized() {
        let config = load(&[
            ("SE_API_BASE", "http://localhost:9000/2.2/"),
            ("SE_API_KEY", "  "),
            ("ALERT_CHAT_ID", "-100123"),
            ("FETCH_MAX_ATTEMPTS", " 3 "),
        ])
        .unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000/2.2");
        assert!(config.api.api_key.is_none());
        assert_eq!(config.alerts.chat_id, Some(-100123));
        assert_eq!(config.api.max_attempts, 3);
    }
}
