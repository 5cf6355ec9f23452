use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::types::Candidate;
use crate::error::bounded;
use crate::store::AvailabilityStore;
use crate::vehicle::VehicleClass;

const PENDING_PREFIX: &str = "pending:";

/// Marker value written at claim time, before the assignment is persisted.
pub fn pending_reference(request_ref: &str) -> String {
    format!("{PENDING_PREFIX}{request_ref}")
}

/// Whether a marker value still refers to an unconfirmed claim.
pub fn is_pending_reference(reference: &str) -> bool {
    reference.starts_with(PENDING_PREFIX)
}

/// Turns a ranked candidate list into at most one claimed worker.
///
/// Candidates are consumed strictly in the order given. The advisory marker
/// pre-check only saves wasted removals; ownership is decided solely by the
/// atomic [`AvailabilityStore::claim`], which removes the worker and writes
/// its pending marker together. Two concurrent callers can never both win the
/// same worker, and a heartbeat can never slip the winner back in between.
///
/// # Failure handling
///
/// A failed or timed-out removal is logged and the candidate is treated as
/// lost. Nothing is retried within a pass, so a flaky store shows up as
/// reduced supply rather than a blocked dispatch.
#[derive(Debug)]
pub struct ClaimProtocol<A> {
    availability: Arc<A>,
    call_timeout: Duration,
    claim_ttl: Duration,
}

impl<A: AvailabilityStore> ClaimProtocol<A> {
    pub fn new(availability: Arc<A>, call_timeout: Duration, claim_ttl: Duration) -> Self {
        Self {
            availability,
            call_timeout,
            claim_ttl,
        }
    }

    /// Claim the first winnable candidate for `request_ref`, or `None` if every
    /// candidate was skipped or lost.
    pub async fn try_claim(
        &self,
        request_ref: &str,
        class: VehicleClass,
        candidates: &[Candidate],
    ) -> Option<Candidate> {
        let reference = pending_reference(request_ref);
        for candidate in candidates {
            let worker_id = &candidate.worker_id;

            match bounded(self.call_timeout, self.availability.has_claim_marker(worker_id)).await {
                Ok(true) => {
                    debug!(
                        worker_id = %worker_id,
                        distance_km = candidate.distance_km,
                        "worker skipped, already holds an assignment"
                    );
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    debug!(worker_id = %worker_id, error = %err, "marker pre-check failed");
                }
            }

            let claim = self
                .availability
                .claim(class, worker_id, &reference, self.claim_ttl);
            match bounded(self.call_timeout, claim).await {
                Ok(true) => return Some(candidate.clone()),
                Ok(false) => {
                    debug!(
                        worker_id = %worker_id,
                        distance_km = candidate.distance_km,
                        "worker skipped, claimed by another request or offline"
                    );
                }
                Err(err) => {
                    warn!(worker_id = %worker_id, error = %err, "failed to claim worker");
                }
            }
        }
        None
    }
}
