//! Dispatch: progressive-radius search plus the single-assignment claim protocol.

pub mod claim;
pub mod engine;
pub mod radius;
pub mod types;

pub use claim::ClaimProtocol;
pub use engine::{DispatchEngine, DispatchRequest};
pub use radius::radius_sequence;
pub use types::{rank_candidates, Assignment, Candidate};
