use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::SurgeCache;
use crate::config::{validate_surge_bounds, PricingConfig};
use crate::error::{Error, StoreError};

#[derive(Debug, Clone, Copy)]
struct Override {
    multiplier: f64,
    expires_at: Option<Instant>,
}

/// Region → surge override values, written by administrative tooling.
///
/// Writes clamp into `[min_surge, max_surge]`; the pricing engine clamps again
/// on read, so a cache shared with differently configured engines stays safe.
#[derive(Debug)]
pub struct InMemorySurgeCache {
    min_surge: f64,
    max_surge: f64,
    overrides: Mutex<HashMap<String, Override>>,
}

impl InMemorySurgeCache {
    /// Build a cache clamping writes to `[min_surge, max_surge]`. The bounds
    /// are checked like [`PricingConfig`] surge bounds.
    pub fn new(min_surge: f64, max_surge: f64) -> Result<Self, Error> {
        validate_surge_bounds(min_surge, max_surge)?;
        Ok(Self {
            min_surge,
            max_surge,
            overrides: Mutex::new(HashMap::new()),
        })
    }

    /// Cache sharing the surge bounds of a pricing configuration.
    pub fn from_config(config: &PricingConfig) -> Result<Self, Error> {
        Self::new(config.min_surge, config.max_surge)
    }

    /// Store an override for `region`. `ttl = None` keeps it until cleared.
    /// Returns the value actually stored after clamping.
    pub fn set_override(
        &self,
        region: &str,
        multiplier: f64,
        ttl: Option<Duration>,
    ) -> Result<f64, StoreError> {
        if !multiplier.is_finite() {
            return Err(StoreError::Unavailable(format!(
                "refusing non-finite surge override {multiplier}"
            )));
        }
        let stored = multiplier.clamp(self.min_surge, self.max_surge);
        let mut overrides = self
            .overrides
            .lock()
            .map_err(|_| StoreError::Unavailable("surge cache lock poisoned".to_string()))?;
        overrides.insert(
            region.to_string(),
            Override {
                multiplier: stored,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(stored)
    }

    pub fn clear_override(&self, region: &str) {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.remove(region);
        }
    }
}

impl SurgeCache for InMemorySurgeCache {
    async fn get_override(&self, region: &str) -> Result<Option<f64>, StoreError> {
        let now = Instant::now();
        let mut overrides = self
            .overrides
            .lock()
            .map_err(|_| StoreError::Unavailable("surge cache lock poisoned".to_string()))?;
        match overrides.get(region).copied() {
            Some(Override {
                expires_at: Some(expires_at),
                ..
            }) if expires_at <= now => {
                overrides.remove(region);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.multiplier)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_override_clamps_to_bounds() {
        let cache = InMemorySurgeCache::new(1.0, 3.0).expect("valid bounds");
        assert_eq!(cache.set_override("downtown", 7.5, None).expect("set"), 3.0);
        assert_eq!(cache.get_override("downtown").await.expect("get"), Some(3.0));
        assert_eq!(cache.set_override("suburb", 0.2, None).expect("set"), 1.0);
        assert_eq!(cache.get_override("airport").await.expect("get"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn overrides_expire_after_ttl() {
        let cache = InMemorySurgeCache::new(1.0, 3.0).expect("valid bounds");
        cache
            .set_override("downtown", 2.0, Some(Duration::from_secs(60)))
            .expect("set");
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_override("downtown").await.expect("get"), None);
    }

    #[test]
    fn rejects_invalid_bounds_at_construction() {
        for (min, max) in [(3.0, 1.0), (f64::NAN, 3.0), (1.0, f64::INFINITY), (0.0, 2.0)] {
            let err = InMemorySurgeCache::new(min, max).expect_err("invalid bounds");
            assert!(matches!(err, Error::Configuration(_)), "({min}, {max})");
        }
    }

    #[test]
    fn from_config_uses_pricing_bounds() {
        let config = PricingConfig::default().with_surge_bounds(1.2, 2.0);
        let cache = InMemorySurgeCache::from_config(&config).expect("cache");
        assert_eq!(cache.set_override("downtown", 2.5, None).expect("set"), 2.0);
        assert_eq!(cache.set_override("suburb", 1.0, None).expect("set"), 1.2);
    }

    #[test]
    fn rejects_non_finite_override() {
        let cache = InMemorySurgeCache::new(1.0, 3.0).expect("valid bounds");
        assert!(cache.set_override("downtown", f64::NAN, None).is_err());
    }
}
