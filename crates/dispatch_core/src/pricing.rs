//! Fare calculation and demand-responsive surge pricing.
//!
//! Formula: `subtotal = base + distance_km × per_km + duration_minutes × per_minute`,
//! `total = subtotal × surge`.
//!
//! Surge follows a piecewise-linear curve over the demand/supply ratio
//! `r = active_assignments / available_workers`:
//!
//! | ratio            | multiplier                 |
//! |------------------|----------------------------|
//! | `r < 0.5`        | `1.0`                      |
//! | `0.5 ≤ r < 1.0`  | `1.0 + 0.5·r`              |
//! | `1.0 ≤ r < 2.0`  | `1.5 + (r − 1.0)`          |
//! | `r ≥ 2.0`        | `2.5 + 0.25·(r − 2.0)`     |
//!
//! The result (or an administered override) is always clamped to
//! `[min_surge, max_surge]`. With no available workers the multiplier is
//! `max_surge`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PricingConfig;
use crate::error::{bounded, Error};
use crate::store::{SupplySignal, SurgeCache};
use crate::vehicle::VehicleClass;

/// Default bound on a surge-cache or supply-signal read.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(500);
/// Multiplier used when no surge source can be read.
const NO_SURGE: f64 = 1.0;

/// Full fare for a settled trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub distance_fare: f64,
    pub time_fare: f64,
    pub surge_multiplier: f64,
    pub subtotal: f64,
    pub total: f64,
}

/// Computes quotes and settlement fares.
///
/// Surge is read-only from here: overrides are administered elsewhere and
/// counts come from the [`SupplySignal`].
#[derive(Debug)]
pub struct PricingEngine<S, P> {
    config: PricingConfig,
    surge_cache: Arc<S>,
    supply: Arc<P>,
    call_timeout: Duration,
}

impl<S, P> PricingEngine<S, P>
where
    S: SurgeCache,
    P: SupplySignal,
{
    pub fn new(config: PricingConfig, surge_cache: Arc<S>, supply: Arc<P>) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            surge_cache,
            supply,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Pre-trip quote. Pure: no surge, no I/O.
    pub fn estimate_fare(
        &self,
        class: VehicleClass,
        distance_km: f64,
        duration_minutes: f64,
    ) -> Result<f64, Error> {
        Ok(self.breakdown(class, distance_km, duration_minutes, NO_SURGE)?.subtotal)
    }

    /// Settlement fare with the region's current surge applied.
    pub async fn settle_fare(
        &self,
        class: VehicleClass,
        distance_km: f64,
        duration_minutes: f64,
        region: &str,
    ) -> Result<FareBreakdown, Error> {
        // Validate before touching any store.
        self.breakdown(class, distance_km, duration_minutes, NO_SURGE)?;
        let surge = self.current_surge(region).await;
        self.breakdown(class, distance_km, duration_minutes, surge)
    }

    /// Surge for `region`: the administered override if one is set, otherwise
    /// derived from the supply signal.
    pub async fn current_surge(&self, region: &str) -> f64 {
        match bounded(self.call_timeout, self.surge_cache.get_override(region)).await {
            Ok(Some(multiplier)) if multiplier.is_finite() => return self.clamp_surge(multiplier),
            Ok(_) => {}
            Err(err) => warn!(region, error = %err, "surge override read failed"),
        }

        match bounded(self.call_timeout, self.supply.snapshot(region)).await {
            Ok(snapshot) => {
                self.compute_surge(snapshot.active_assignments, snapshot.available_workers)
            }
            Err(err) => {
                warn!(region, error = %err, "supply signal read failed, pricing without surge");
                self.clamp_surge(NO_SURGE)
            }
        }
    }

    /// Multiplier from the demand/supply counts, clamped to the configured bounds.
    pub fn compute_surge(&self, active_assignments: u64, available_workers: u64) -> f64 {
        if available_workers == 0 {
            return self.config.max_surge;
        }
        let ratio = active_assignments as f64 / available_workers as f64;
        let raw = if ratio < 0.5 {
            1.0
        } else if ratio < 1.0 {
            1.0 + ratio * 0.5
        } else if ratio < 2.0 {
            1.5 + (ratio - 1.0)
        } else {
            2.5 + (ratio - 2.0) * 0.25
        };
        self.clamp_surge(raw)
    }

    fn clamp_surge(&self, multiplier: f64) -> f64 {
        multiplier.clamp(self.config.min_surge, self.config.max_surge)
    }

    fn breakdown(
        &self,
        class: VehicleClass,
        distance_km: f64,
        duration_minutes: f64,
        surge_multiplier: f64,
    ) -> Result<FareBreakdown, Error> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(Error::invalid_input(format!(
                "distance_km must be non-negative, got {distance_km}"
            )));
        }
        if !duration_minutes.is_finite() || duration_minutes < 0.0 {
            return Err(Error::invalid_input(format!(
                "duration_minutes must be non-negative, got {duration_minutes}"
            )));
        }
        let schedule = self.config.schedule(class)?;
        let distance_fare = distance_km * schedule.per_km;
        let time_fare = duration_minutes * schedule.per_minute;
        let subtotal = schedule.base + distance_fare + time_fare;
        Ok(FareBreakdown {
            base_fare: schedule.base,
            distance_fare,
            time_fare,
            surge_multiplier,
            subtotal,
            total: subtotal * surge_multiplier,
        })
    }
}
