//! Engine configuration: dispatch radius strategy and fare schedules.
//!
//! Defaults mirror the production environment defaults. [`EngineConfig::from_env`]
//! overlays environment variables on top of them and fails fast on values it
//! cannot parse; every bundle is checked by `validate()` before an engine is
//! built from it.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::vehicle::VehicleClass;

/// Default initial search radius (km).
const DEFAULT_INITIAL_RADIUS_KM: f64 = 5.0;
/// Default maximum expanded search radius (km).
const DEFAULT_MAX_RADIUS_KM: f64 = 50.0;
const DEFAULT_CANDIDATE_CAP: usize = 10;
/// Default bound on a single store call (ms).
const DEFAULT_PER_RADIUS_TIMEOUT_MS: u64 = 500;
/// Pending claim markers bridge the gap until the assignment is persisted.
const DEFAULT_CLAIM_TTL_SECS: u64 = 30;
/// Confirmed assignments self-heal after a day if settlement never runs.
const DEFAULT_CONFIRMED_CLAIM_TTL_SECS: u64 = 24 * 60 * 60;

/// Progressive-radius dispatch parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub initial_radius_km: f64,
    pub max_radius_km: f64,
    /// Maximum number of candidates fetched per radius tier.
    pub candidate_cap: usize,
    /// Upper bound on each geo-index or availability-store call (ms).
    pub per_radius_timeout_ms: u64,
    pub claim_ttl_secs: u64,
    pub confirmed_claim_ttl_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            initial_radius_km: DEFAULT_INITIAL_RADIUS_KM,
            max_radius_km: DEFAULT_MAX_RADIUS_KM,
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            per_radius_timeout_ms: DEFAULT_PER_RADIUS_TIMEOUT_MS,
            claim_ttl_secs: DEFAULT_CLAIM_TTL_SECS,
            confirmed_claim_ttl_secs: DEFAULT_CONFIRMED_CLAIM_TTL_SECS,
        }
    }
}

impl DispatchConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.per_radius_timeout_ms)
    }

    pub fn claim_ttl(&self) -> Duration {
        Duration::from_secs(self.claim_ttl_secs)
    }

    pub fn confirmed_claim_ttl(&self) -> Duration {
        Duration::from_secs(self.confirmed_claim_ttl_secs)
    }

    pub fn with_radii(mut self, initial_radius_km: f64, max_radius_km: f64) -> Self {
        self.initial_radius_km = initial_radius_km;
        self.max_radius_km = max_radius_km;
        self
    }

    pub fn with_candidate_cap(mut self, candidate_cap: usize) -> Self {
        self.candidate_cap = candidate_cap;
        self
    }

    pub fn with_per_radius_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_radius_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.initial_radius_km.is_finite() || self.initial_radius_km <= 0.0 {
            return Err(Error::configuration(
                "initial_radius_km must be a positive number",
            ));
        }
        if !self.max_radius_km.is_finite() {
            return Err(Error::configuration("max_radius_km must be finite"));
        }
        if self.initial_radius_km > self.max_radius_km {
            return Err(Error::configuration(format!(
                "initial_radius_km ({}) must not exceed max_radius_km ({})",
                self.initial_radius_km, self.max_radius_km
            )));
        }
        if self.candidate_cap == 0 {
            return Err(Error::configuration("candidate_cap must be positive"));
        }
        if self.per_radius_timeout_ms == 0 {
            return Err(Error::configuration(
                "per_radius_timeout_ms must be positive",
            ));
        }
        if self.claim_ttl_secs == 0 || self.confirmed_claim_ttl_secs == 0 {
            return Err(Error::configuration("claim TTLs must be positive"));
        }
        Ok(())
    }
}

/// Rates for one vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareSchedule {
    pub base: f64,
    pub per_km: f64,
    pub per_minute: f64,
}

impl FareSchedule {
    pub const fn new(base: f64, per_km: f64, per_minute: f64) -> Self {
        Self {
            base,
            per_km,
            per_minute,
        }
    }
}

/// Fare schedules per vehicle class plus surge bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub schedules: BTreeMap<VehicleClass, FareSchedule>,
    pub min_surge: f64,
    pub max_surge: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            schedules: BTreeMap::from([
                (VehicleClass::Economy, FareSchedule::new(50.0, 10.0, 2.0)),
                (VehicleClass::Premium, FareSchedule::new(100.0, 15.0, 3.0)),
                (VehicleClass::Luxury, FareSchedule::new(200.0, 25.0, 5.0)),
            ]),
            min_surge: 1.0,
            max_surge: 3.0,
        }
    }
}

impl PricingConfig {
    pub fn schedule(&self, class: VehicleClass) -> Result<FareSchedule, Error> {
        self.schedules
            .get(&class)
            .copied()
            .ok_or_else(|| Error::invalid_input(format!("no fare schedule for class {class}")))
    }

    pub fn with_schedule(mut self, class: VehicleClass, schedule: FareSchedule) -> Self {
        self.schedules.insert(class, schedule);
        self
    }

    pub fn with_surge_bounds(mut self, min_surge: f64, max_surge: f64) -> Self {
        self.min_surge = min_surge;
        self.max_surge = max_surge;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        for class in VehicleClass::ALL {
            let schedule = self
                .schedules
                .get(&class)
                .ok_or_else(|| Error::configuration(format!("missing fare schedule for {class}")))?;
            let rates = [schedule.base, schedule.per_km, schedule.per_minute];
            if rates.iter().any(|rate| !rate.is_finite() || *rate < 0.0) {
                return Err(Error::configuration(format!(
                    "fare schedule for {class} must be non-negative"
                )));
            }
        }
        validate_surge_bounds(self.min_surge, self.max_surge)
    }
}

/// Surge bounds must be finite with `0 < min_surge <= max_surge`.
pub(crate) fn validate_surge_bounds(min_surge: f64, max_surge: f64) -> Result<(), Error> {
    if !min_surge.is_finite() || min_surge <= 0.0 {
        return Err(Error::configuration("min_surge must be positive"));
    }
    if !max_surge.is_finite() || max_surge < min_surge {
        return Err(Error::configuration(format!(
            "max_surge ({max_surge}) must be >= min_surge ({min_surge})"
        )));
    }
    Ok(())
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dispatch: DispatchConfig,
    pub pricing: PricingConfig,
}

impl EngineConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` as the variable source. Unset or empty variables keep
    /// their defaults; unparsable ones are a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();
        let dispatch = &mut config.dispatch;
        read_var(&lookup, "MAX_MATCHING_RADIUS_KM", &mut dispatch.initial_radius_km)?;
        read_var(&lookup, "MAX_EXPANDED_RADIUS_KM", &mut dispatch.max_radius_km)?;
        read_var(&lookup, "MAX_DRIVER_CANDIDATES", &mut dispatch.candidate_cap)?;
        read_var(&lookup, "MATCHING_CALL_TIMEOUT_MS", &mut dispatch.per_radius_timeout_ms)?;
        read_var(&lookup, "CLAIM_TTL_SECONDS", &mut dispatch.claim_ttl_secs)?;
        read_var(
            &lookup,
            "CONFIRMED_CLAIM_TTL_SECONDS",
            &mut dispatch.confirmed_claim_ttl_secs,
        )?;

        let pricing = &mut config.pricing;
        for class in VehicleClass::ALL {
            let suffix = class.as_str().to_ascii_uppercase();
            if let Some(schedule) = pricing.schedules.get_mut(&class) {
                read_var(&lookup, &format!("BASE_FARE_{suffix}"), &mut schedule.base)?;
                read_var(&lookup, &format!("PER_KM_RATE_{suffix}"), &mut schedule.per_km)?;
                read_var(
                    &lookup,
                    &format!("PER_MINUTE_RATE_{suffix}"),
                    &mut schedule.per_minute,
                )?;
            }
        }
        read_var(&lookup, "MAX_SURGE_MULTIPLIER", &mut pricing.max_surge)?;
        read_var(&lookup, "MIN_SURGE_MULTIPLIER", &mut pricing.min_surge)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.dispatch.validate()?;
        self.pricing.validate()
    }
}

fn read_var<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }
    *target = raw
        .parse()
        .map_err(|_| Error::configuration(format!("{key}='{raw}' could not be parsed")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.dispatch.initial_radius_km, 5.0);
        assert_eq!(config.dispatch.max_radius_km, 50.0);
        assert_eq!(config.dispatch.claim_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_initial_radius_above_max() {
        let config = DispatchConfig::default().with_radii(60.0, 50.0);
        let err = config.validate().expect_err("initial > max must fail");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_zero_candidate_cap() {
        let config = DispatchConfig::default().with_candidate_cap(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_surge_bounds() {
        let config = PricingConfig::default().with_surge_bounds(2.0, 1.5);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("MAX_MATCHING_RADIUS_KM", "2.5"),
            ("MAX_DRIVER_CANDIDATES", "25"),
            ("BASE_FARE_LUXURY", "250"),
            ("MAX_SURGE_MULTIPLIER", "4.0"),
            ("MIN_SURGE_MULTIPLIER", ""),
        ]))
        .expect("config loads");
        assert_eq!(config.dispatch.initial_radius_km, 2.5);
        assert_eq!(config.dispatch.candidate_cap, 25);
        assert_eq!(
            config.pricing.schedule(VehicleClass::Luxury).expect("luxury").base,
            250.0
        );
        assert_eq!(config.pricing.max_surge, 4.0);
        assert_eq!(config.pricing.min_surge, 1.0);
    }

    #[test]
    fn env_rejects_unparsable_values() {
        let err = EngineConfig::from_lookup(lookup_from(&[("MAX_DRIVER_CANDIDATES", "ten")]))
            .expect_err("unparsable value");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"dispatch": {"max_radius_km": 30.0}}"#).expect("json");
        assert_eq!(config.dispatch.max_radius_km, 30.0);
        assert_eq!(config.dispatch.initial_radius_km, 5.0);
        assert_eq!(config.pricing, PricingConfig::default());
    }
}
