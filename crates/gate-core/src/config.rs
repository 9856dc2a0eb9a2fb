use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Validated gate configuration. Construction fails fast on bad values.
#[derive(Clone)]
pub struct GateConfig {
    name: Option<String>,
    calls: u32,
    period: Duration,
    raise_on_limit: bool,
    clock: Arc<dyn Clock>,
}

impl GateConfig {
    pub fn new(calls: u32, period: Duration) -> Result<Self, ConfigError> {
        if calls < 1 {
            return Err(ConfigError::InvalidCalls(i64::from(calls)));
        }
        if period.is_zero() {
            return Err(ConfigError::InvalidPeriod(0.0));
        }
        Ok(Self {
            name: None,
            calls,
            period,
            raise_on_limit: true,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// When false, over-limit calls yield `None` instead of an error.
    pub fn raise_on_limit(mut self, raise: bool) -> Self {
        self.raise_on_limit = raise;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("gate")
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn raises_on_limit(&self) -> bool {
        self.raise_on_limit
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("name", &self.name)
            .field("calls", &self.calls)
            .field("period", &self.period)
            .field("raise_on_limit", &self.raise_on_limit)
            .finish_non_exhaustive()
    }
}

fn default_raise() -> bool {
    true
}

/// On-disk form of a gate configuration.
///
/// ```toml
/// name = "httpbin"
/// calls = 1
/// period_secs = 1.0
/// raise_on_limit = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    #[serde(default)]
    pub name: Option<String>,
    pub calls: i64,
    pub period_secs: f64,
    #[serde(default = "default_raise")]
    pub raise_on_limit: bool,
}

impl GateSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).context("read gate config")?;
        let parsed = toml::from_str::<GateSettings>(&raw).context("parse gate config")?;
        Ok(parsed)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let data = toml::to_string_pretty(self)?;
        std::fs::write(path, data).context("write gate config")?;
        Ok(())
    }
}

impl TryFrom<GateSettings> for GateConfig {
    type Error = ConfigError;

    fn try_from(settings: GateSettings) -> Result<Self, Self::Error> {
        let calls = u32::try_from(settings.calls)
            .ok()
            .filter(|c| *c >= 1)
            .ok_or(ConfigError::InvalidCalls(settings.calls))?;
        if !settings.period_secs.is_finite() || settings.period_secs <= 0.0 {
            return Err(ConfigError::InvalidPeriod(settings.period_secs));
        }
        let period = Duration::try_from_secs_f64(settings.period_secs)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or(ConfigError::InvalidPeriod(settings.period_secs))?;
        let mut config = GateConfig::new(calls, period)?.raise_on_limit(settings.raise_on_limit);
        if let Some(name) = settings.name {
            config = config.with_name(name);
        }
        Ok(config)
    }
}
