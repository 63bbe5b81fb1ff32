//! Engine configuration, merged from TOML and environment.

use anyhow::Result;
use chrono::NaiveTime;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use odte_core::RetryPolicy;
use odte_lifecycle::LifecycleConfig;
use odte_risk::GovernorConfig;
use odte_signals::{
    EnsembleConfig, FeatureConfig, MetaPolicyConfig, PredictorConfig, RegimeConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Underlyings scanned for entries each cycle.
    pub symbols: Vec<String>,
    /// Bars fetched per symbol for feature computation.
    pub lookback_bars: usize,
    /// Budget for one symbol's data fetches; a stalled symbol is skipped,
    /// never the whole cycle.
    pub per_symbol_timeout_secs: u64,
    /// Hard deadline after which every open position is flattened.
    pub close_deadline: NaiveTime,
    /// Expiry window scanned on the chain.
    pub min_dte: i64,
    pub max_dte: i64,
    /// Scheduler interval between cycles.
    pub cycle_interval_secs: u64,
    /// Ensemble confidence required to hand a candidate to the governor.
    pub min_entry_confidence: f64,
    /// Regime confidence below which regime-gated agents sit out.
    pub regime_floor: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            symbols: vec!["SPY".to_string(), "QQQ".to_string()],
            lookback_bars: 120,
            per_symbol_timeout_secs: 10,
            close_deadline: NaiveTime::from_hms_opt(15, 50, 0).unwrap_or_default(),
            min_dte: 0,
            max_dte: 30,
            cycle_interval_secs: 300,
            min_entry_confidence: 0.60,
            regime_floor: 0.30,
        }
    }
}

/// Full application configuration, one section per stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineSettings,
    pub features: FeatureConfig,
    pub regime: RegimeConfig,
    pub meta: MetaPolicyConfig,
    pub predictor: PredictorConfig,
    pub ensemble: EnsembleConfig,
    pub governor: GovernorConfig,
    pub lifecycle: LifecycleConfig,
    pub retry: RetryPolicy,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging the TOML file with `ODTE_`-prefixed
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file("config/Odte.toml"))
            .merge(Env::prefixed("ODTE_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Loads configuration with a profile overlay (e.g. `paper`, `live`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file("config/Odte.toml"))
            .merge(Toml::file(format!("config/Odte.{profile}.toml")))
            .merge(Env::prefixed("ODTE_").split("__"))
            .extract()?;
        Ok(config)
    }
}
