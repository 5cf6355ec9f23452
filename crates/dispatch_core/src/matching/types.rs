use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, WorkerId};

/// A worker found near a query point. Produced fresh per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub worker_id: WorkerId,
    pub coordinate: Coordinate,
    pub distance_km: f64,
}

impl Candidate {
    /// Build a candidate at `coordinate`, measuring its distance from `origin`.
    pub fn new(worker_id: WorkerId, coordinate: Coordinate, origin: Coordinate) -> Self {
        Self {
            distance_km: origin.distance_km(&coordinate),
            worker_id,
            coordinate,
        }
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance_km
            .total_cmp(&other.distance_km)
            .then_with(|| self.worker_id.cmp(&other.worker_id))
    }
}

/// Sort ascending by distance, ties broken by worker id.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(Candidate::rank_cmp);
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub request_ref: String,
    pub worker_id: WorkerId,
    pub coordinate: Coordinate,
    pub distance_km: f64,
    /// Radius tier in which the worker was claimed.
    pub search_radius_km: f64,
}
