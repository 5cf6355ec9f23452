//! In-memory availability store: per-class available sets and claim markers.
//!
//! A single mutex guards both maps, so `try_remove`, `claim` and
//! `add_unless_claimed` each observe and change the sets and markers in one
//! step. Markers expire lazily on read against `tokio::time`, so
//! tests can pause and advance the clock.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use super::{AvailabilityStore, SupplySignal, SupplySnapshot};
use crate::error::StoreError;
use crate::geo::WorkerId;
use crate::vehicle::VehicleClass;

#[derive(Debug, Clone)]
struct ClaimMarker {
    reference: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct AvailabilityState {
    available: HashMap<VehicleClass, HashSet<WorkerId>>,
    markers: HashMap<WorkerId, ClaimMarker>,
}

impl AvailabilityState {
    fn live_marker(&mut self, worker_id: &WorkerId, now: Instant) -> Option<&ClaimMarker> {
        if self
            .markers
            .get(worker_id)
            .is_some_and(|marker| marker.expires_at <= now)
        {
            self.markers.remove(worker_id);
        }
        self.markers.get(worker_id)
    }

    /// Move `worker_id` into the `class` partition, leaving any other one.
    fn place(&mut self, class: VehicleClass, worker_id: &WorkerId) {
        for (other, set) in self.available.iter_mut() {
            if *other != class {
                set.remove(worker_id);
            }
        }
        self.available
            .entry(class)
            .or_default()
            .insert(worker_id.clone());
    }

    fn purge_expired(&mut self, now: Instant) {
        self.markers.retain(|_, marker| marker.expires_at > now);
    }
}

/// Availability store for a single region. [`SupplySignal`] snapshots ignore
/// the region argument and report counts for everything held here.
#[derive(Debug, Default)]
pub struct InMemoryAvailability {
    state: Mutex<AvailabilityState>,
}

impl InMemoryAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, AvailabilityState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("availability lock poisoned".to_string()))
    }

    /// Whether `worker_id` is currently in the `class` partition.
    pub fn is_available(&self, class: VehicleClass, worker_id: &WorkerId) -> Result<bool, StoreError> {
        let state = self.lock()?;
        Ok(state
            .available
            .get(&class)
            .is_some_and(|set| set.contains(worker_id)))
    }

    /// Number of available workers in `class`.
    pub fn available_count(&self, class: VehicleClass) -> Result<usize, StoreError> {
        Ok(self.lock()?.available.get(&class).map_or(0, HashSet::len))
    }
}

impl AvailabilityStore for InMemoryAvailability {
    async fn try_remove(&self, class: VehicleClass, worker_id: &WorkerId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        Ok(state
            .available
            .get_mut(&class)
            .is_some_and(|set| set.remove(worker_id)))
    }

    async fn claim(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let expires_at = Instant::now() + ttl;
        let mut state = self.lock()?;
        let removed = state
            .available
            .get_mut(&class)
            .is_some_and(|set| set.remove(worker_id));
        if removed {
            state.markers.insert(
                worker_id.clone(),
                ClaimMarker {
                    reference: reference.to_string(),
                    expires_at,
                },
            );
        }
        Ok(removed)
    }

    async fn add(&self, class: VehicleClass, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.lock()?.place(class, worker_id);
        Ok(())
    }

    async fn add_unless_claimed(
        &self,
        class: VehicleClass,
        worker_id: &WorkerId,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        if state.live_marker(worker_id, now).is_some() {
            return Ok(false);
        }
        state.place(class, worker_id);
        Ok(true)
    }

    async fn set_claim_marker(
        &self,
        worker_id: &WorkerId,
        reference: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl;
        let mut state = self.lock()?;
        state.markers.insert(
            worker_id.clone(),
            ClaimMarker {
                reference: reference.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn claim_marker(&self, worker_id: &WorkerId) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        Ok(state
            .live_marker(worker_id, now)
            .map(|marker| marker.reference.clone()))
    }

    async fn clear_claim_marker(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.lock()?.markers.remove(worker_id);
        Ok(())
    }
}

impl SupplySignal for InMemoryAvailability {
    async fn snapshot(&self, _region: &str) -> Result<SupplySnapshot, StoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        state.purge_expired(now);
        let available_workers = state.available.values().map(HashSet::len).sum::<usize>();
        Ok(SupplySnapshot {
            active_assignments: state.markers.len() as u64,
            available_workers: available_workers as u64,
        })
    }
}
