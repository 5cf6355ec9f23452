//! Fleet seeding helpers.

use std::sync::Arc;

use dispatch_core::store::{AvailabilityStore, GeoIndex, InMemoryAvailability, InMemoryGeoIndex};
use dispatch_core::{Coordinate, DispatchConfig, DispatchEngine, VehicleClass, WorkerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Index `worker_id` at `north_km` due north of `origin` without making it available.
pub async fn place<G: GeoIndex>(geo: &G, origin: Coordinate, worker_id: &str, north_km: f64) {
    geo.upsert(&WorkerId::from(worker_id), origin.offset_km(north_km, 0.0))
        .await
        .expect("upsert");
}

/// Index `worker_id` at `north_km` from `origin` and mark it available for `class`.
pub async fn place_available<G: GeoIndex, A: AvailabilityStore>(
    geo: &G,
    availability: &A,
    origin: Coordinate,
    worker_id: &str,
    north_km: f64,
    class: VehicleClass,
) {
    place(geo, origin, worker_id, north_km).await;
    availability
        .add(class, &WorkerId::from(worker_id))
        .await
        .expect("add");
}

/// Scatter `count` available economy workers uniformly within `radius_km` of `origin`.
pub async fn scatter_fleet(
    geo: &InMemoryGeoIndex,
    availability: &InMemoryAvailability,
    origin: Coordinate,
    count: usize,
    radius_km: f64,
    seed: u64,
) -> Vec<WorkerId> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let id = WorkerId::new(format!("driver-{i:04}"));
        let north = rng.gen_range(-radius_km..radius_km) * 0.7;
        let east = rng.gen_range(-radius_km..radius_km) * 0.7;
        geo.upsert(&id, origin.offset_km(north, east)).await.expect("upsert");
        availability
            .add(VehicleClass::Economy, &id)
            .await
            .expect("add");
        ids.push(id);
    }
    ids
}

pub type MemoryEngine = DispatchEngine<InMemoryGeoIndex, InMemoryAvailability>;

/// Engine over fresh in-memory stores, returning the stores for seeding.
pub fn memory_engine(
    config: DispatchConfig,
) -> (Arc<MemoryEngine>, Arc<InMemoryGeoIndex>, Arc<InMemoryAvailability>) {
    let geo = Arc::new(InMemoryGeoIndex::default());
    let availability = Arc::new(InMemoryAvailability::new());
    let engine = DispatchEngine::new(Arc::clone(&geo), Arc::clone(&availability), config)
        .expect("valid dispatch config");
    (Arc::new(engine), geo, availability)
}
