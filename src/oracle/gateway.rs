//! Access-controlled gateway to the external randomness oracle.
//!
//! The gateway is the only writer of request records: games request
//! numbers through it, the coordinator delivers fulfillments through it,
//! and everyone polls status through it. It is handed to each game
//! instance as an explicit capability at construction.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::{FortunaError, FortunaResult};
use crate::{Address, RequestId};

/// Transport to the oracle network: forwards a generation request.
/// Fulfillment comes back out-of-band through
/// [`RandomnessGateway::on_fulfilled`].
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn request_random_words(&self, request_id: RequestId) -> FortunaResult<()>;
}

/// A two-phase randomness request. Written exclusively by the gateway;
/// read-only to game engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub id: RequestId,
    pub requester: Address,
    pub fulfilled: bool,
    pub value: u128,
}

/// Wraps the external oracle behind an approval table.
pub struct RandomnessGateway {
    owner: Address,
    coordinator: Address,
    oracle: Arc<dyn OracleClient>,
    approved: DashMap<Address, bool>,
    requests: DashMap<RequestId, RandomnessRequest>,
    next_id: AtomicU64,
}

impl RandomnessGateway {
    pub fn new(
        owner: impl Into<Address>,
        coordinator: impl Into<Address>,
        oracle: Arc<dyn OracleClient>,
    ) -> Self {
        Self {
            owner: owner.into(),
            coordinator: coordinator.into(),
            oracle,
            approved: DashMap::new(),
            requests: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Grant or revoke a caller's right to request numbers. Owner-only,
    /// idempotent.
    pub fn approve(&self, caller: &str, subject: impl Into<Address>, allowed: bool) -> FortunaResult<()> {
        if caller != self.owner {
            return Err(FortunaError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        let subject = subject.into();
        tracing::info!(%subject, allowed, "generator approval updated");
        self.approved.insert(subject, allowed);
        Ok(())
    }

    pub fn is_approved(&self, who: &str) -> bool {
        self.approved.get(who).map(|allowed| *allowed).unwrap_or(false)
    }

    /// Forward a generation request to the oracle and record it as
    /// pending. Only approved callers may request.
    pub async fn request_random_number(&self, caller: &str) -> FortunaResult<RequestId> {
        if !self.is_approved(caller) {
            return Err(FortunaError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.requests.insert(
            id,
            RandomnessRequest {
                id,
                requester: caller.to_string(),
                fulfilled: false,
                value: 0,
            },
        );
        if let Err(e) = self.oracle.request_random_words(id).await {
            self.requests.remove(&id);
            return Err(e);
        }
        tracing::debug!(request = id, requester = caller, "randomness requested");
        Ok(id)
    }

    /// Oracle callback: the only mutation path for `fulfilled`/`value`,
    /// accepted from the coordinator alone. A second delivery for the
    /// same id is rejected and leaves the stored value untouched.
    pub fn on_fulfilled(&self, caller: &str, request_id: RequestId, value: u128) -> FortunaResult<()> {
        if caller != self.coordinator {
            return Err(FortunaError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        let mut request = self
            .requests
            .get_mut(&request_id)
            .ok_or(FortunaError::UnknownRequest { request: request_id })?;
        if request.fulfilled {
            return Err(FortunaError::AlreadyFulfilled { request: request_id });
        }
        request.fulfilled = true;
        request.value = value;
        tracing::debug!(request = request_id, "randomness fulfilled");
        Ok(())
    }

    /// `(fulfilled, value)`; `(false, 0)` for unknown or pending ids,
    /// which callers must not treat as distinguishable.
    pub fn request_status(&self, request_id: RequestId) -> (bool, u128) {
        self.requests
            .get(&request_id)
            .map(|r| (r.fulfilled, r.value))
            .unwrap_or((false, 0))
    }

    /// Full request record, if the id was ever issued.
    pub fn request(&self, request_id: RequestId) -> Option<RandomnessRequest> {
        self.requests.get(&request_id).map(|r| r.clone())
    }
}
