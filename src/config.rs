use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine tuning knobs. The shipped values are working defaults, not
/// authoritative constants; every threshold is adjustable via file or
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum confidence for a price to be surfaced.
    pub accept_threshold: f64,
    /// Acceptance bar for sites flagged with highly variable markup.
    pub relaxed_threshold: f64,
    /// Confidence multiplier applied on an expected-currency mismatch.
    pub currency_mismatch_factor: f64,
    /// Amounts at or above this are treated as digit-concatenation
    /// artifacts and rejected.
    pub max_plausible_price: f64,
    /// Currency assumed when nothing on the page or in the site rules
    /// names one.
    pub fallback_currency: String,
    /// Ceiling for the mutation-wait operation.
    pub wait_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.70,
            relaxed_threshold: 0.65,
            currency_mismatch_factor: 0.8,
            max_plausible_price: 100_000.0,
            fallback_currency: "USD".to_string(),
            wait_timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    /// Layered load: the defaults, an optional `price_scout.toml` next to
    /// the process, then `PRICE_SCOUT_*` environment overrides.
    pub fn load() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("price_scout").required(false))
            .add_source(::config::Environment::with_prefix("PRICE_SCOUT"))
            .build()?;
        let mut loaded: Self = settings.try_deserialize()?;
        loaded.accept_threshold = loaded.accept_threshold.clamp(0.0, 1.0);
        loaded.relaxed_threshold = loaded.relaxed_threshold.clamp(0.0, 1.0);
        loaded.currency_mismatch_factor = loaded.currency_mismatch_factor.clamp(0.0, 1.0);
        Ok(loaded)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}
