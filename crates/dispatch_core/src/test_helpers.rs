//! Test helpers for common test setup and utilities.
//!
//! Shared fixtures for unit tests, integration tests, benchmarks and examples.

use crate::geo::Coordinate;
use crate::matching::{rank_candidates, Candidate};

/// Reference pickup point: Berlin Mitte.
pub const TEST_ORIGIN: (f64, f64) = (52.5200, 13.4050);

/// Get the test origin as a `Coordinate`.
///
/// # Panics
///
/// Panics if the constant is out of range (should never happen).
pub fn test_origin() -> Coordinate {
    Coordinate::new(TEST_ORIGIN.0, TEST_ORIGIN.1).expect("TEST_ORIGIN should be a valid coordinate")
}

/// Ranked candidates placed due north of `origin` at the given kilometre distances.
pub fn candidates_at(origin: Coordinate, placements: &[(&str, f64)]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = placements
        .iter()
        .map(|(id, km)| Candidate::new((*id).into(), origin.offset_km(*km, 0.0), origin))
        .collect();
    rank_candidates(&mut candidates);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_ranked_by_distance() {
        let candidates = candidates_at(test_origin(), &[("far", 4.0), ("near", 0.5)]);
        assert_eq!(candidates[0].worker_id.as_str(), "near");
        assert!((candidates[1].distance_km - 4.0).abs() < 0.01);
    }
}
