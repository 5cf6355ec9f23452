//! Collaborator traits: the geo index, the availability store and the surge
//! sources the engine reads from.
//!
//! All shared mutable state lives behind these traits. The engine relies on
//! two atomicity guarantees from [`AvailabilityStore`]: `claim` must report
//! whether *this* call removed the id (and write the marker in the same step),
//! and `add_unless_claimed` must never re-add a worker holding a marker.
//! Everything else may be best-effort.
//!
//! In-memory implementations live in the submodules:
//!
//! - **`InMemoryGeoIndex`**: H3-bucketed positions with an exact haversine filter
//! - **`InMemoryAvailability`**: class-partitioned availability sets and TTL claim markers
//! - **`InMemorySurgeCache`**: per-region override multipliers with their own TTL

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;
use crate::geo::{Coordinate, WorkerId};
use crate::matching::Candidate;
use crate::vehicle::VehicleClass;

pub mod availability;
pub mod geo_index;
pub mod surge_cache;

pub use availability::InMemoryAvailability;
pub use geo_index::InMemoryGeoIndex;
pub use surge_cache::InMemorySurgeCache;

/// Worker positions with nearest-neighbour queries.
pub trait GeoIndex: Send + Sync {
    /// Insert or move a worker.
    fn upsert(
        &self,
        worker_id: &WorkerId,
        position: Coordinate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Forget a worker's position.
    fn remove(&self, worker_id: &WorkerId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Up to `limit` workers within `radius_km` of `origin`, nearest first.
    fn query_nearest(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Candidate>, StoreError>> + Send;
}

/// Availability sets partitioned by vehicle class, plus per-worker claim markers.
pub trait AvailabilityStore: Send + Sync {
    /// Atomically remove `worker_id` from the `class` partition. Returns `true`
    /// only for the single caller whose removal actually took the id out.
    fn try_remove(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically remove `worker_id` from the `class` partition and write its
    /// claim marker. Returns `true` only for the single caller that won; the
    /// worker is never observable as unavailable without its marker.
    fn claim(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Mark `worker_id` as available in the `class` partition. A worker sits in
    /// at most one partition; joining one leaves any other.
    fn add(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Like [`add`](Self::add), but refuses a worker holding a live claim
    /// marker. The check and the insert happen in one step. Returns whether the
    /// worker was added.
    fn add_unless_claimed(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Write (or overwrite) the claim marker for `worker_id`, expiring after `ttl`.
    fn set_claim_marker(
        &self,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The unexpired marker value, if any.
    fn claim_marker(
        &self,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn has_claim_marker(
        &self,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        let marker = self.claim_marker(worker_id);
        async move { Ok(marker.await?.is_some()) }
    }

    fn clear_claim_marker(
        &self,
        worker_id: &WorkerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Externally administered surge overrides, read-only from the engine.
pub trait SurgeCache: Send + Sync {
    fn get_override(
        &self,
        region: &str,
    ) -> impl Future<Output = Result<Option<f64>, StoreError>> + Send;
}

/// Demand and supply counts observed for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupplySnapshot {
    pub active_assignments: u64,
    pub available_workers: u64,
}

/// Source of the demand/supply signal surge is derived from.
pub trait SupplySignal: Send + Sync {
    fn snapshot(
        &self,
        region: &str,
    ) -> impl Future<Output = Result<SupplySnapshot, StoreError>> + Send;
}

/// Surge cache for deployments that never administer overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSurgeOverrides;

impl SurgeCache for NoSurgeOverrides {
    async fn get_override(&self, _region: &str) -> Result<Option<f64>, StoreError> {
        Ok(None)
    }
}
