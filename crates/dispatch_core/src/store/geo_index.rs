//! In-memory geo index: H3 cell → worker mappings with exact distance filtering.
//!
//! Positions are bucketed by H3 cell so a radius query only touches the cells
//! of a grid disk around the origin instead of every worker. The disk is
//! sized conservatively from the average edge length at the index
//! resolution; candidates are then filtered and ranked by haversine distance,
//! so the cell bucketing never changes the result, only the work done.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use h3o::{CellIndex, Resolution};

use super::GeoIndex;
use crate::error::StoreError;
use crate::geo::{Coordinate, WorkerId};
use crate::matching::{rank_candidates, Candidate};

/// Average hexagon edge length at resolution 0 (km); each finer level divides by √7.
const RES0_EDGE_KM: f64 = 1281.256011;
/// Fraction of the average edge length assumed as worst-case cell spacing.
const SPACING_FACTOR: f64 = 0.75;
/// Beyond this disk size a full scan is cheaper than enumerating cells.
const MAX_DISK_K: u32 = 120;

#[derive(Debug, Default)]
struct Buckets {
    workers_by_cell: HashMap<CellIndex, Vec<WorkerId>>,
    /// Reverse mapping for moves and removals.
    worker_to_cell: HashMap<WorkerId, (CellIndex, Coordinate)>,
}

impl Buckets {
    fn detach(&mut self, worker_id: &WorkerId) -> Option<(CellIndex, Coordinate)> {
        let (cell, position) = self.worker_to_cell.remove(worker_id)?;
        if let Some(workers) = self.workers_by_cell.get_mut(&cell) {
            workers.retain(|w| w != worker_id);
            if workers.is_empty() {
                self.workers_by_cell.remove(&cell);
            }
        }
        Some((cell, position))
    }
}

#[derive(Debug)]
pub struct InMemoryGeoIndex {
    resolution: Resolution,
    buckets: Mutex<Buckets>,
}

impl Default for InMemoryGeoIndex {
    fn default() -> Self {
        Self::new(Resolution::Seven)
    }
}

impl InMemoryGeoIndex {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.lock().map(|b| b.worker_to_cell.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, worker_id: &WorkerId) -> Option<Coordinate> {
        self.lock()
            .ok()?
            .worker_to_cell
            .get(worker_id)
            .map(|(_, position)| *position)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>, StoreError> {
        self.buckets
            .lock()
            .map_err(|_| StoreError::Unavailable("geo index lock poisoned".to_string()))
    }

    fn edge_km(&self) -> f64 {
        RES0_EDGE_KM / 7f64.sqrt().powi(i32::from(u8::from(self.resolution)))
    }

    /// Grid distance that covers every cell with a point within `radius_km`.
    fn disk_k(&self, radius_km: f64) -> u32 {
        let spacing = self.edge_km() * SPACING_FACTOR;
        let k = (radius_km / spacing).ceil() + 1.0;
        if k >= f64::from(MAX_DISK_K) {
            MAX_DISK_K
        } else {
            k.max(0.0) as u32
        }
    }

    fn collect_within(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        let buckets = self.lock()?;
        let k = self.disk_k(radius_km);

        let mut candidates: Vec<Candidate> = if k >= MAX_DISK_K {
            buckets
                .worker_to_cell
                .iter()
                .map(|(worker_id, (_, position))| Candidate::new(worker_id.clone(), *position, origin))
                .filter(|candidate| candidate.distance_km <= radius_km)
                .collect()
        } else {
            let origin_cell = origin
                .to_cell(self.resolution)
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            origin_cell
                .grid_disk::<Vec<_>>(k)
                .into_iter()
                .filter_map(|cell| buckets.workers_by_cell.get(&cell))
                .flatten()
                .filter_map(|worker_id| {
                    buckets
                        .worker_to_cell
                        .get(worker_id)
                        .map(|(_, position)| Candidate::new(worker_id.clone(), *position, origin))
                })
                .filter(|candidate| candidate.distance_km <= radius_km)
                .collect()
        };

        rank_candidates(&mut candidates);
        candidates.truncate(limit);
        Ok(candidates)
    }
}

impl GeoIndex for InMemoryGeoIndex {
    async fn upsert(&self, worker_id: &WorkerId, position: Coordinate) -> Result<(), StoreError> {
        let cell = position
            .to_cell(self.resolution)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let mut buckets = self.lock()?;
        buckets.detach(worker_id);
        buckets
            .workers_by_cell
            .entry(cell)
            .or_default()
            .push(worker_id.clone());
        buckets
            .worker_to_cell
            .insert(worker_id.clone(), (cell, position));
        Ok(())
    }

    async fn remove(&self, worker_id: &WorkerId) -> Result<(), StoreError> {
        self.lock()?.detach(worker_id);
        Ok(())
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        self.collect_within(origin, radius_km, limit)
    }
}
