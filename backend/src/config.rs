use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use coordinator::CoordinatorConfig;
use monitor::{
    CombineMode, LiquidationRule, MonitorConfig, MonitorError, PriceRule, SocialRule,
    rules::social::DEFAULT_COOLDOWN,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    Parse {
        key: String,
        value: String,
        reason: String,
    },

    #[error("WATCHLIST must name at least one entity")]
    EmptyWatchlist,

    #[error("{section} monitor: {source}")]
    Monitor {
        section: &'static str,
        #[source]
        source: MonitorError,
    },

    #[error("coordinator: {0}")]
    Coordinator(#[from] coordinator::CoordinatorError),
}

/// One monitor plus where its readings come from.
#[derive(Clone, Debug)]
pub struct MonitorSection {
    pub monitor: MonitorConfig,

    /// Base URL of the HTTP metric source. Readings are fetched from
    /// `{source_url}/{entity}`.
    pub source_url: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Entities every monitor starts with (`WATCHLIST`, comma separated).
    pub watchlist: Vec<String>,

    // =========================
    // Monitors
    // =========================
    /// Relative price move over the lookback window.
    ///
    /// Env prefix `PRICE_`: `INTERVAL_SECS`, `FETCH_TIMEOUT_SECS`,
    /// `THRESHOLD` (fraction, 0.08 = 8%), `WINDOW_SECS`,
    /// `HISTORY_CAPACITY`, `SOURCE_URL`.
    pub price: MonitorSection,

    /// Forced-liquidation volume in USD.
    ///
    /// Same keys with prefix `LIQUIDATION_`, plus
    /// `LIQUIDATION_MARKET_THRESHOLD_USD` for the market-wide aggregate.
    pub liquidation: MonitorSection,

    /// Relative social-volume change. Prefix `SOCIAL_`.
    pub social: MonitorSection,

    /// Per (entity, severity) suppression of repeated social spikes
    /// (`SOCIAL_COOLDOWN_SECS`).
    pub social_cooldown: Duration,

    // =========================
    // Coordinator
    // =========================
    /// `CORRELATION_WINDOW_SECS`, `DEDUP_RETENTION_SECS` (default 3 windows),
    /// `ALERT_QUEUE_CAPACITY`.
    pub coordinator: CoordinatorConfig,

    /// How often expired buffers and dedup keys are swept
    /// (`SWEEP_INTERVAL_SECS`).
    pub sweep_interval: Duration,

    /// Period of the status summary log line (`STATUS_LOG_INTERVAL_SECS`).
    pub status_log_interval: Duration,

    /// Alerts are posted here when set (`WEBHOOK_URL`); otherwise they are
    /// only written to the log.
    pub webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let watchlist = parse_list(&env.get("WATCHLIST").unwrap_or_else(|| "BTC,ETH,SOL".into()));
        if watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }

        let price = env.section(
            "PRICE",
            PriceRule::default_config(watchlist.clone()),
            "http://127.0.0.1:8080/price",
        )?;

        let mut liquidation = env.section(
            "LIQUIDATION",
            LiquidationRule::default_config(watchlist.clone()),
            "http://127.0.0.1:8080/liquidations",
        )?;
        if let CombineMode::WithAggregate { threshold, .. } = &mut liquidation.monitor.combine {
            *threshold = env.parse("LIQUIDATION_MARKET_THRESHOLD_USD", *threshold)?;
        }

        let social = env.section(
            "SOCIAL",
            SocialRule::default_config(watchlist.clone()),
            "http://127.0.0.1:8080/social",
        )?;

        let social_cooldown = env.secs("SOCIAL_COOLDOWN_SECS", DEFAULT_COOLDOWN)?;

        let defaults = CoordinatorConfig::default();
        let correlation_window = env.secs("CORRELATION_WINDOW_SECS", defaults.correlation_window)?;
        let coordinator = CoordinatorConfig {
            correlation_window,
            dedup_retention: env.secs("DEDUP_RETENTION_SECS", correlation_window * 3)?,
            queue_capacity: env.parse("ALERT_QUEUE_CAPACITY", defaults.queue_capacity)?,
        };
        coordinator.validate()?;

        for (section, s) in [
            ("price", &price),
            ("liquidation", &liquidation),
            ("social", &social),
        ] {
            s.monitor
                .validate()
                .map_err(|source| ConfigError::Monitor { section, source })?;
        }

        Ok(Self {
            watchlist,
            price,
            liquidation,
            social,
            social_cooldown,
            coordinator,
            sweep_interval: env.secs("SWEEP_INTERVAL_SECS", Duration::from_secs(60))?,
            status_log_interval: env.secs("STATUS_LOG_INTERVAL_SECS", Duration::from_secs(300))?,
            webhook_url: env.get("WEBHOOK_URL").filter(|u| !u.trim().is_empty()),
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let secs = self.parse(key, default.as_secs())?;
        Ok(Duration::from_secs(secs))
    }

    fn section(
        &self,
        prefix: &str,
        mut monitor: MonitorConfig,
        default_url: &str,
    ) -> Result<MonitorSection, ConfigError> {
        let key = |name: &str| format!("{prefix}_{name}");

        monitor.interval = self.secs(&key("INTERVAL_SECS"), monitor.interval)?;
        monitor.fetch_timeout = self.secs(&key("FETCH_TIMEOUT_SECS"), monitor.fetch_timeout)?;
        monitor.threshold = self.parse(&key("THRESHOLD"), monitor.threshold)?;
        monitor.window = self.secs(&key("WINDOW_SECS"), monitor.window)?;
        monitor.history_capacity = self.parse(&key("HISTORY_CAPACITY"), monitor.history_capacity)?;

        let source_url = self
            .get(&key("SOURCE_URL"))
            .unwrap_or_else(|| default_url.to_string());

        Ok(MonitorSection {
            monitor,
            source_url,
        })
    }
}

/// Splits a comma-separated list, trimming and dropping empty items.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
