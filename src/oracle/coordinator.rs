//! In-process oracle coordinator.
//!
//! Stands in for the oracle network in tests and single-node
//! deployments: records forwarded requests and delivers fulfillments in
//! a separate, later call, with values derived deterministically from a
//! seed. The gap between the two calls is the cross-transaction
//! asynchrony real deployments see.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::errors::{FortunaError, FortunaResult};
use crate::oracle::{OracleClient, RandomnessGateway};
use crate::{Address, RequestId};

pub struct LocalCoordinator {
    address: Address,
    seed: [u8; 32],
    pending: DashMap<RequestId, ()>,
}

impl LocalCoordinator {
    pub fn new(address: impl Into<Address>, seed: [u8; 32]) -> Self {
        Self {
            address: address.into(),
            seed,
            pending: DashMap::new(),
        }
    }

    /// Coordinator with a random seed (for tests).
    pub fn new_random(address: impl Into<Address>) -> Self {
        use rand::RngCore;
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::new(address, seed)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn has_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    /// Deliver the fulfillment for a forwarded request, deriving the
    /// random word from the seed and request id.
    pub fn fulfill(&self, gateway: &RandomnessGateway, request_id: RequestId) -> FortunaResult<u128> {
        let value = self.derive(request_id);
        self.fulfill_with(gateway, request_id, value)?;
        Ok(value)
    }

    /// Deliver a chosen value instead of a derived one. Tests pin
    /// parities and bucket boundaries with this.
    pub fn fulfill_with(
        &self,
        gateway: &RandomnessGateway,
        request_id: RequestId,
        value: u128,
    ) -> FortunaResult<()> {
        self.pending
            .remove(&request_id)
            .ok_or(FortunaError::UnknownRequest { request: request_id })?;
        if let Err(e) = gateway.on_fulfilled(&self.address, request_id, value) {
            self.pending.insert(request_id, ());
            return Err(e);
        }
        Ok(())
    }

    fn derive(&self, request_id: RequestId) -> u128 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(request_id.to_be_bytes());
        let digest = hasher.finalize();
        let mut word = [0u8; 16];
        word.copy_from_slice(&digest[..16]);
        tracing::debug!(
            request = request_id,
            word = %hex::encode(word),
            "derived random word"
        );
        u128::from_be_bytes(word)
    }
}

#[async_trait]
impl OracleClient for LocalCoordinator {
    async fn request_random_words(&self, request_id: RequestId) -> FortunaResult<()> {
        self.pending.insert(request_id, ());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_request_then_fulfill() {
        let coordinator = Arc::new(LocalCoordinator::new("vrf-coordinator", [7u8; 32]));
        let gateway =
            RandomnessGateway::new("owner", "vrf-coordinator", coordinator.clone());
        gateway.approve("owner", "game", true).expect("approve");

        let id = gateway.request_random_number("game").await.expect("request");
        assert!(coordinator.has_pending(id));

        let value = coordinator.fulfill(&gateway, id).expect("fulfill");
        assert!(!coordinator.has_pending(id));
        assert_eq!(gateway.request_status(id), (true, value));
        assert_ne!(value, 0);
    }

    #[tokio::test]
    async fn test_derivation_is_deterministic() {
        let a = LocalCoordinator::new("c", [1u8; 32]);
        let b = LocalCoordinator::new("c", [1u8; 32]);
        assert_eq!(a.derive(5), b.derive(5));
        assert_ne!(a.derive(5), a.derive(6));
    }

    #[tokio::test]
    async fn test_cannot_fulfill_unforwarded_request() {
        let coordinator = Arc::new(LocalCoordinator::new_random("vrf-coordinator"));
        let gateway =
            RandomnessGateway::new("owner", "vrf-coordinator", coordinator.clone());

        let err = coordinator
            .fulfill(&gateway, 1)
            .expect_err("nothing was forwarded");
        assert!(matches!(err, FortunaError::UnknownRequest { .. }));
    }

    #[tokio::test]
    async fn test_double_fulfill_rejected() {
        let coordinator = Arc::new(LocalCoordinator::new_random("vrf-coordinator"));
        let gateway =
            RandomnessGateway::new("owner", "vrf-coordinator", coordinator.clone());
        gateway.approve("owner", "game", true).expect("approve");
        let id = gateway.request_random_number("game").await.expect("request");

        coordinator.fulfill_with(&gateway, id, 3).expect("fulfill");
        let err = coordinator
            .fulfill_with(&gateway, id, 4)
            .expect_err("second delivery must fail");
        assert!(matches!(err, FortunaError::UnknownRequest { .. }));
        assert_eq!(gateway.request_status(id), (true, 3));
    }
}
