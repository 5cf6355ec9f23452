use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::claim::ClaimProtocol;
use super::radius::radius_sequence;
use super::types::{rank_candidates, Assignment};
use crate::config::DispatchConfig;
use crate::error::{bounded, Error};
use crate::geo::Coordinate;
use crate::store::{AvailabilityStore, GeoIndex};
use crate::vehicle::VehicleClass;

/// Transport-shaped dispatch request, validated before any store call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub request_ref: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub vehicle_class: String,
}

impl DispatchRequest {
    pub fn validate(&self) -> Result<(Coordinate, VehicleClass), Error> {
        if self.request_ref.trim().is_empty() {
            return Err(Error::invalid_input("request_ref cannot be empty"));
        }
        let origin = Coordinate::new(self.pickup_lat, self.pickup_lng)?;
        let class = self.vehicle_class.parse()?;
        Ok((origin, class))
    }
}

/// Matches a request to the nearest claimable worker by searching radius
/// tiers of increasing size.
///
/// The engine keeps no mutable state of its own and can be shared across
/// tasks behind an `Arc`; all contention is resolved by the availability
/// store's atomic removal.
#[derive(Debug)]
pub struct DispatchEngine<G, A> {
    geo: Arc<G>,
    config: DispatchConfig,
    radii: Vec<f64>,
    claims: ClaimProtocol<A>,
}

impl<G, A> DispatchEngine<G, A>
where
    G: GeoIndex,
    A: AvailabilityStore,
{
    /// Build an engine, rejecting an invalid configuration up front.
    pub fn new(geo: Arc<G>, availability: Arc<A>, config: DispatchConfig) -> Result<Self, Error> {
        config.validate()?;
        let radii = radius_sequence(config.initial_radius_km, config.max_radius_km);
        let claims = ClaimProtocol::new(availability, config.per_call_timeout(), config.claim_ttl());
        Ok(Self {
            geo,
            config,
            radii,
            claims,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Radius tiers searched by every dispatch.
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Validate a raw request and dispatch it.
    pub async fn dispatch_request(&self, request: &DispatchRequest) -> Result<Assignment, Error> {
        let (origin, class) = request.validate()?;
        self.dispatch(&request.request_ref, origin, class).await
    }

    /// Claim the nearest available worker of `class` for `request_ref`.
    ///
    /// Returns [`Error::NoSupply`] once every radius tier is exhausted. Store
    /// failures and timeouts only fail the tier they occur in.
    pub async fn dispatch(
        &self,
        request_ref: &str,
        origin: Coordinate,
        class: VehicleClass,
    ) -> Result<Assignment, Error> {
        let started = Instant::now();

        for (tier, &radius_km) in self.radii.iter().enumerate() {
            let query = self
                .geo
                .query_nearest(origin, radius_km, self.config.candidate_cap);
            let mut candidates = match bounded(self.config.per_call_timeout(), query).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(radius_km, error = %err, "geo query failed, moving to next radius");
                    continue;
                }
            };
            rank_candidates(&mut candidates);
            candidates.truncate(self.config.candidate_cap);

            if candidates.is_empty() {
                debug!(radius_km, "no workers within radius");
            } else if let Some(winner) = self.claims.try_claim(request_ref, class, &candidates).await {
                info!(
                    request_ref,
                    worker_id = %winner.worker_id,
                    distance_km = winner.distance_km,
                    search_radius_km = radius_km,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "worker matched and claimed"
                );
                return Ok(Assignment {
                    request_ref: request_ref.to_string(),
                    worker_id: winner.worker_id,
                    coordinate: winner.coordinate,
                    distance_km: winner.distance_km,
                    search_radius_km: radius_km,
                });
            }

            if let Some(next_radius_km) = self.radii.get(tier + 1) {
                info!(
                    current_radius_km = radius_km,
                    next_radius_km = *next_radius_km,
                    "no available workers in radius, expanding search"
                );
            }
        }

        warn!(
            request_ref,
            max_radius_km = self.config.max_radius_km,
            pickup_lat = origin.latitude(),
            pickup_lng = origin.longitude(),
            "no workers available in maximum search radius"
        );
        Err(Error::NoSupply {
            max_radius_km: self.config.max_radius_km,
        })
    }
}
