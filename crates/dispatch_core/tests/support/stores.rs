//! Scripted collaborators: in-memory stores wrapped with call recording and
//! injectable failures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use dispatch_core::store::{
    AvailabilityStore, GeoIndex, InMemoryAvailability, InMemoryGeoIndex, SupplySignal,
    SupplySnapshot,
};
use dispatch_core::{Candidate, Coordinate, StoreError, VehicleClass, WorkerId};

fn radius_key(radius_km: f64) -> u64 {
    radius_km.to_bits()
}

/// Geo index that records queries and can fail or stall chosen radius tiers.
#[derive(Debug, Default)]
pub struct ScriptedGeoIndex {
    pub inner: InMemoryGeoIndex,
    failing_radii: Mutex<HashSet<u64>>,
    stalled_radii: Mutex<HashSet<u64>>,
    queried_radii: Mutex<Vec<f64>>,
    calls: AtomicUsize,
}

impl ScriptedGeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_radius(&self, radius_km: f64) {
        self.failing_radii.lock().expect("lock").insert(radius_key(radius_km));
    }

    /// Queries at `radius_km` sleep far longer than any call timeout.
    pub fn stall_radius(&self, radius_km: f64) {
        self.stalled_radii.lock().expect("lock").insert(radius_key(radius_km));
    }

    pub fn queried_radii(&self) -> Vec<f64> {
        self.queried_radii.lock().expect("lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeoIndex for ScriptedGeoIndex {
    async fn upsert(&self, worker_id: &WorkerId, position: Coordinate) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(worker_id, position).await
    }

    async fn remove(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(worker_id).await
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried_radii.lock().expect("lock").push(radius_km);
        let key = radius_key(radius_km);
        let stalled = self.stalled_radii.lock().expect("lock").contains(&key);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let failing = self.failing_radii.lock().expect("lock").contains(&key);
        if failing {
            return Err(StoreError::Unavailable("geo index offline".to_string()));
        }
        self.inner.query_nearest(origin, radius_km, limit).await
    }
}

/// Availability store that records claim attempts, can fail chosen workers
/// and can hold back the reply to a won claim.
#[derive(Debug, Default)]
pub struct ScriptedAvailability {
    pub inner: InMemoryAvailability,
    failing_workers: Mutex<HashSet<WorkerId>>,
    claim_attempts: Mutex<Vec<WorkerId>>,
    claim_reply_delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_worker(&self, worker_id: &str) {
        self.failing_workers
            .lock()
            .expect("lock")
            .insert(WorkerId::from(worker_id));
    }

    /// Claims still take effect immediately; only the caller sees the
    /// outcome `delay` later.
    pub fn delay_claim_replies(&self, delay: Duration) {
        *self.claim_reply_delay.lock().expect("lock") = Some(delay);
    }

    pub fn claim_attempts(&self) -> Vec<WorkerId> {
        self.claim_attempts.lock().expect("lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_workers.lock().expect("lock").contains(worker_id) {
            return Err(StoreError::Unavailable(format!("shard for {worker_id} down")));
        }
        Ok(())
    }
}

impl AvailabilityStore for ScriptedAvailability {
    async fn try_remove(&self, class: VehicleClass, worker_id: &WorkerId) -> Result<bool, StoreError> {
        self.check(worker_id)?;
        self.inner.try_remove(class, worker_id).await
    }

    async fn claim(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.claim_attempts.lock().expect("lock").push(worker_id.clone());
        self.check(worker_id)?;
        let won = self.inner.claim(class, worker_id, reference, ttl).await?;
        let delay = *self.claim_reply_delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(won)
    }

    async fn add(&self, class: VehicleClass, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.check(worker_id)?;
        self.inner.add(class, worker_id).await
    }

    async fn add_unless_claimed(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
    ) -> Result<bool, StoreError> {
        self.check(worker_id)?;
        self.inner.add_unless_claimed(class, worker_id).await
    }

    async fn set_claim_marker(
        &self,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.check(worker_id)?;
        self.inner.set_claim_marker(worker_id, reference, ttl).await
    }

    async fn claim_marker(&self, worker_id: &WorkerId) -> Result<Option<String>, StoreError> {
        self.check(worker_id)?;
        self.inner.claim_marker(worker_id).await
    }

    async fn clear_claim_marker(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.check(worker_id)?;
        self.inner.clear_claim_marker(worker_id).await
    }
}

/// Supply signal that is always unreachable.
#[derive(Debug, Default)]
pub struct UnreachableSupply;

impl SupplySignal for UnreachableSupply {
    async fn snapshot(&self, _region: &str) -> Result<SupplySnapshot, StoreError> {
        Err(StoreError::Unavailable("metrics store offline".to_string()))
    }
}

/// Supply signal reporting fixed counts.
#[derive(Debug, Clone, Copy)]
pub struct FixedSupply(pub SupplySnapshot);

impl SupplySignal for FixedSupply {
    async fn snapshot(&self, _region: &str) -> Result<SupplySnapshot, StoreError> {
        Ok(self.0)
    }
}
