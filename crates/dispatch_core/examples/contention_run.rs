//! Put a small fleet under contention: many concurrent dispatches around one
//! pickup point, then confirm, settle and release every match.
//!
//! Run with: cargo run -p dispatch_core --example contention_run
//! Tune logging with RUST_LOG, e.g. RUST_LOG=dispatch_core=debug.

use std::sync::Arc;

use dispatch_core::store::{InMemoryAvailability, InMemoryGeoIndex, InMemorySurgeCache};
use dispatch_core::{
    DispatchEngine, EngineConfig, Error, Fleet, PricingEngine, VehicleClass, WorkerId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const NUM_DRIVERS: usize = 40;
const NUM_REQUESTS: usize = 60;
const REGION: &str = "berlin-mitte";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dispatch_core=info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let geo = Arc::new(InMemoryGeoIndex::default());
    let availability = Arc::new(InMemoryAvailability::new());
    let surge_cache = Arc::new(InMemorySurgeCache::from_config(&config.pricing)?);
    let fleet = Fleet::new(Arc::clone(&geo), Arc::clone(&availability), &config.dispatch);
    let engine = Arc::new(DispatchEngine::new(
        Arc::clone(&geo),
        Arc::clone(&availability),
        config.dispatch.clone(),
    )?);
    let pricing = PricingEngine::new(config.pricing.clone(), surge_cache, Arc::clone(&availability))?;

    let origin = dispatch_core::Coordinate::new(52.5200, 13.4050)?;
    let mut rng = StdRng::seed_from_u64(123);
    for i in 0..NUM_DRIVERS {
        let class = VehicleClass::ALL[i % VehicleClass::ALL.len()];
        let position = origin.offset_km(rng.gen_range(-12.0..12.0), rng.gen_range(-12.0..12.0));
        fleet
            .go_online(&WorkerId::new(format!("driver-{i:03}")), class, position)
            .await?;
    }

    let handles: Vec<_> = (0..NUM_REQUESTS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let class = VehicleClass::ALL[i % VehicleClass::ALL.len()];
            tokio::spawn(async move { (class, engine.dispatch(&format!("ride-{i:03}"), origin, class).await) })
        })
        .collect();

    let mut matched = Vec::new();
    let mut unmatched = 0;
    for handle in handles {
        match handle.await {
            Ok((class, Ok(assignment))) => matched.push((class, assignment)),
            Ok((_, Err(Error::NoSupply { .. }))) => unmatched += 1,
            Ok((_, Err(err))) => return Err(err),
            Err(join_err) => {
                tracing::error!(error = %join_err, "dispatch task panicked");
                unmatched += 1;
            }
        }
    }

    let mut revenue = 0.0;
    for (class, assignment) in &matched {
        fleet
            .confirm_assignment(&assignment.worker_id, &format!("trip-{}", assignment.request_ref))
            .await?;
        let trip_km = assignment.distance_km + 5.0;
        let fare = pricing.settle_fare(*class, trip_km, trip_km * 2.5, REGION).await?;
        revenue += fare.total;
        fleet.release_assignment(&assignment.worker_id).await?;
    }

    let mean_pickup_km = if matched.is_empty() {
        0.0
    } else {
        matched.iter().map(|(_, a)| a.distance_km).sum::<f64>() / matched.len() as f64
    };

    println!(
        "--- Contention run ({} drivers, {} concurrent requests, seed 123) ---",
        NUM_DRIVERS, NUM_REQUESTS
    );
    println!("Matched: {}", matched.len());
    println!("No supply: {}", unmatched);
    println!("Mean pickup distance: {:.2} km", mean_pickup_km);
    println!("Settled revenue: {:.2}", revenue);
    Ok(())
}
