//! Randomness acquisition: the access-controlled gateway every game
//! depends on, the oracle transport seam, and an in-process coordinator
//! for tests and single-node deployments.

mod coordinator;
mod gateway;

pub use coordinator::LocalCoordinator;
pub use gateway::{OracleClient, RandomnessGateway, RandomnessRequest};
