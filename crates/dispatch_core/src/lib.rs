//! Dispatch and pricing engine for on-demand transport.
//!
//! A request is matched to the nearest claimable worker by searching radius
//! tiers of increasing size ([`matching::DispatchEngine`]); ownership of a
//! worker is decided by a single atomic removal from a shared availability
//! store ([`matching::ClaimProtocol`]). Trips are priced by
//! [`pricing::PricingEngine`] with a surge multiplier derived from the same
//! supply signal.

pub mod config;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod matching;
pub mod pricing;
pub mod store;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{DispatchConfig, EngineConfig, FareSchedule, PricingConfig};
pub use error::{Error, StoreError};
pub use fleet::Fleet;
pub use geo::{Coordinate, WorkerId};
pub use matching::{Assignment, Candidate, DispatchEngine, DispatchRequest};
pub use pricing::{FareBreakdown, PricingEngine};
pub use vehicle::VehicleClass;
