//! Worker-side flows around dispatch: location heartbeats, going on and off
//! shift, and confirming or releasing a claimed assignment.
//!
//! These are the only paths that put a worker back into an availability
//! partition. A worker that lost a claim race becomes claimable again only
//! after its next `go_online`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::DispatchConfig;
use crate::error::{bounded, Error};
use crate::geo::{Coordinate, WorkerId};
use crate::store::{AvailabilityStore, GeoIndex};
use crate::vehicle::VehicleClass;

#[derive(Debug)]
pub struct Fleet<G, A> {
    geo: Arc<G>,
    availability: Arc<A>,
    call_timeout: Duration,
    confirmed_claim_ttl: Duration,
}

impl<G, A> Fleet<G, A>
where
    G: GeoIndex,
    A: AvailabilityStore,
{
    pub fn new(geo: Arc<G>, availability: Arc<A>, config: &DispatchConfig) -> Self {
        Self {
            geo,
            availability,
            call_timeout: config.per_call_timeout(),
            confirmed_claim_ttl: config.confirmed_claim_ttl(),
        }
    }

    /// Location heartbeat: move the worker in the geo index.
    pub async fn report_location(&self, worker_id: &WorkerId, position: Coordinate) -> Result<(), Error> {
        bounded(self.call_timeout, self.geo.upsert(worker_id, position)).await?;
        Ok(())
    }

    /// Publish the worker's position and make it claimable for `class`.
    ///
    /// A worker that still holds an assignment marker only has its position
    /// updated; the marker check and the insert are a single store call.
    /// Returns whether the worker was added to the availability set.
    pub async fn go_online(
        &self,
        worker_id: &WorkerId,
        class: VehicleClass,
        position: Coordinate,
    ) -> Result<bool, Error> {
        self.report_location(worker_id, position).await?;
        let added = bounded(
            self.call_timeout,
            self.availability.add_unless_claimed(class, worker_id),
        )
        .await?;
        if added {
            info!(worker_id = %worker_id, vehicle_class = %class, "worker online");
        } else {
            debug!(worker_id = %worker_id, "worker still assigned, not marked available");
        }
        Ok(added)
    }

    /// Withdraw the worker from dispatch in every class partition. Returns
    /// whether it was still available anywhere.
    pub async fn go_offline(&self, worker_id: &WorkerId) -> Result<bool, Error> {
        let mut was_available = false;
        for class in VehicleClass::ALL {
            was_available |=
                bounded(self.call_timeout, self.availability.try_remove(class, worker_id)).await?;
        }
        bounded(self.call_timeout, self.geo.remove(worker_id)).await?;
        info!(worker_id = %worker_id, was_available, "worker offline");
        Ok(was_available)
    }

    /// Replace the pending claim marker with the durable assignment id once the
    /// assignment has been persisted.
    pub async fn confirm_assignment(&self, worker_id: &WorkerId, assignment_id: &str) -> Result<(), Error> {
        if assignment_id.trim().is_empty() {
            return Err(Error::invalid_input("assignment_id cannot be empty"));
        }
        bounded(
            self.call_timeout,
            self.availability
                .set_claim_marker(worker_id, assignment_id, self.confirmed_claim_ttl),
        )
        .await?;
        info!(worker_id = %worker_id, assignment_id, "assignment confirmed");
        Ok(())
    }

    /// Drop the worker's claim marker after settlement, cancellation or a
    /// failed persistence step.
    pub async fn release_assignment(&self, worker_id: &WorkerId) -> Result<(), Error> {
        bounded(self.call_timeout, self.availability.clear_claim_marker(worker_id)).await?;
        info!(worker_id = %worker_id, "assignment released");
        Ok(())
    }

    /// The worker's current marker value, if any.
    pub async fn current_assignment(&self, worker_id: &WorkerId) -> Result<Option<String>, Error> {
        Ok(bounded(self.call_timeout, self.availability.claim_marker(worker_id)).await?)
    }
}
