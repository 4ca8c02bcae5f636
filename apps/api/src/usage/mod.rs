//! Usage Gate: free-tier quota and premium-only enforcement.
//!
//! The gate holds no state of its own: the plan arrives with the verified
//! [`Identity`] and the free-usage counter lives in an external
//! [`EntitlementStore`]. Admission reserves one unit of quota atomically, so
//! concurrent requests can never be admitted past the limit. The reservation
//! is released if the gated operation fails and kept once it succeeds, so the
//! counter always equals the number of successful free-tier generations.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::auth::Identity;
use crate::errors::AppError;

pub mod redis_store;

pub use redis_store::RedisEntitlementStore;

/// Number of metered generations a free user gets.
pub const FREE_USAGE_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("entitlement store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("stored counter out of range: {0}")]
    InvalidCounter(i64),
}

/// External key-value entitlement service holding each free user's counter.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Current counter, `None` if the user has never been observed.
    async fn free_usage(&self, user_id: &str) -> Result<Option<u32>, EntitlementError>;

    /// Sets the counter to 0 only if it does not exist yet.
    async fn initialize_free_usage(&self, user_id: &str) -> Result<(), EntitlementError>;

    /// Atomically increments the counter unless it already reached `ceiling`.
    /// Returns the new value, or `None` when the ceiling blocked the increment.
    async fn reserve_free_usage(
        &self,
        user_id: &str,
        ceiling: u32,
    ) -> Result<Option<u32>, EntitlementError>;

    /// Undoes one reservation. Never takes the counter below 0.
    async fn release_free_usage(&self, user_id: &str) -> Result<(), EntitlementError>;
}

/// How a feature is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Free users may call it while under the quota.
    Metered,
    /// Requires the premium plan regardless of the counter.
    PremiumOnly,
}

/// Proof of admission. Settle it with [`UsageGate::commit`] on success or
/// [`UsageGate::release`] on failure.
#[derive(Debug)]
#[must_use = "a permit must be committed or released"]
pub struct Permit {
    user_id: String,
    metered: bool,
}

impl Permit {
    pub fn is_metered(&self) -> bool {
        self.metered
    }
}

#[derive(Clone)]
pub struct UsageGate {
    store: Arc<dyn EntitlementStore>,
    limit: u32,
}

impl UsageGate {
    pub fn new(store: Arc<dyn EntitlementStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    /// Decides whether `identity` may run a feature with the given access rule.
    ///
    /// Premium callers are admitted without touching the store. For free callers
    /// the counter is read (and initialized to 0 on first sight), then one unit
    /// is reserved with an atomic check-and-increment. Any store failure denies
    /// the request as `Unauthorized`.
    pub async fn admit(&self, identity: &Identity, access: Access) -> Result<Permit, AppError> {
        if identity.plan.is_premium() {
            return Ok(Permit {
                user_id: identity.user_id.clone(),
                metered: false,
            });
        }

        let store_failure = |e: EntitlementError| {
            error!(user_id = %identity.user_id, "Entitlement lookup failed: {e}");
            AppError::Unauthorized
        };

        let usage = self.observe(&identity.user_id).await.map_err(store_failure)?;

        if access == Access::PremiumOnly {
            warn!(user_id = %identity.user_id, "Premium-only feature requested on free plan");
            return Err(AppError::PlanRequired);
        }

        if usage >= self.limit {
            warn!(user_id = %identity.user_id, usage, "Free usage limit reached");
            return Err(AppError::QuotaExceeded);
        }

        let reserved = self
            .store
            .reserve_free_usage(&identity.user_id, self.limit)
            .await
            .map_err(store_failure)?;
        let Some(usage) = reserved else {
            warn!(user_id = %identity.user_id, "Free usage limit reached by a concurrent request");
            return Err(AppError::QuotaExceeded);
        };

        debug!(user_id = %identity.user_id, usage, "Reserved free-tier usage");
        Ok(Permit {
            user_id: identity.user_id.clone(),
            metered: true,
        })
    }

    /// Keeps the reservation: the gated operation succeeded.
    pub fn commit(&self, permit: Permit) {
        if permit.metered {
            info!(user_id = %permit.user_id, "Free usage consumed");
        }
    }

    /// Gives the reserved unit back after a failed operation. Store failures
    /// are logged; the request already failed for its own reason.
    pub async fn release(&self, permit: Permit) {
        if !permit.metered {
            return;
        }

        match self.store.release_free_usage(&permit.user_id).await {
            Ok(()) => debug!(user_id = %permit.user_id, "Released free usage reservation"),
            Err(e) => error!(user_id = %permit.user_id, "Failed to release free usage: {e}"),
        }
    }

    async fn observe(&self, user_id: &str) -> Result<u32, EntitlementError> {
        match self.store.free_usage(user_id).await? {
            Some(usage) => Ok(usage),
            None => {
                self.store.initialize_free_usage(user_id).await?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Plan;
    use crate::testing::MemoryEntitlementStore;

    fn free_user(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            plan: Plan::Free,
        }
    }

    fn premium_user(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            plan: Plan::Premium,
        }
    }

    fn gate(store: &Arc<MemoryEntitlementStore>) -> UsageGate {
        UsageGate::new(store.clone(), FREE_USAGE_LIMIT)
    }

    #[tokio::test]
    async fn test_first_sight_initializes_counter_and_admits() {
        let store = Arc::new(MemoryEntitlementStore::default());
        let permit = gate(&store)
            .admit(&free_user("u1"), Access::Metered)
            .await
            .unwrap();

        assert!(permit.is_metered());
        // Initialized to 0, then the admitted request holds one unit.
        assert_eq!(store.get("u1"), Some(1));
    }

    #[tokio::test]
    async fn test_free_user_admitted_below_limit() {
        let store = Arc::new(MemoryEntitlementStore::default());
        for usage in 0..FREE_USAGE_LIMIT {
            store.set("u1", usage);
            assert!(
                gate(&store).admit(&free_user("u1"), Access::Metered).await.is_ok(),
                "usage {usage} should be admitted"
            );
        }
    }

    #[tokio::test]
    async fn test_free_user_at_limit_gets_quota_exceeded() {
        let store = Arc::new(MemoryEntitlementStore::default());
        store.set("u1", FREE_USAGE_LIMIT);

        let result = gate(&store).admit(&free_user("u1"), Access::Metered).await;
        assert!(matches!(result, Err(AppError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn test_premium_only_denied_for_free_regardless_of_usage() {
        let store = Arc::new(MemoryEntitlementStore::default());
        for usage in [0, 5, FREE_USAGE_LIMIT, FREE_USAGE_LIMIT + 3] {
            store.set("u1", usage);
            let result = gate(&store).admit(&free_user("u1"), Access::PremiumOnly).await;
            assert!(matches!(result, Err(AppError::PlanRequired)), "usage {usage}");
        }
    }

    #[tokio::test]
    async fn test_premium_never_touches_store() {
        let store = Arc::new(MemoryEntitlementStore::failing());
        let g = gate(&store);

        let permit = g.admit(&premium_user("p1"), Access::PremiumOnly).await.unwrap();
        assert!(!permit.is_metered());
        g.commit(permit);

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let store = Arc::new(MemoryEntitlementStore::failing());
        let result = gate(&store).admit(&free_user("u1"), Access::Metered).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_admission_reserves_and_commit_keeps_it() {
        let store = Arc::new(MemoryEntitlementStore::default());
        store.set("u1", 3);
        let g = gate(&store);

        let permit = g.admit(&free_user("u1"), Access::Metered).await.unwrap();
        assert_eq!(store.get("u1"), Some(4));

        g.commit(permit);
        assert_eq!(store.get("u1"), Some(4));
    }

    #[tokio::test]
    async fn test_release_returns_reserved_unit() {
        let store = Arc::new(MemoryEntitlementStore::default());
        store.set("u1", 3);
        let g = gate(&store);

        let permit = g.admit(&free_user("u1"), Access::Metered).await.unwrap();
        g.release(permit).await;
        assert_eq!(store.get("u1"), Some(3));
    }

    #[tokio::test]
    async fn test_two_requests_at_last_slot_yield_one_generation() {
        let store = Arc::new(MemoryEntitlementStore::default());
        store.set("u1", FREE_USAGE_LIMIT - 1);
        let g = gate(&store);

        let first = g.admit(&free_user("u1"), Access::Metered).await.unwrap();
        let second = g.admit(&free_user("u1"), Access::Metered).await;
        assert!(matches!(second, Err(AppError::QuotaExceeded)));

        g.commit(first);
        assert_eq!(store.get("u1"), Some(FREE_USAGE_LIMIT));
    }

    /// Reports a stale counter below the limit while another request has
    /// already taken the last slot.
    struct LastSlotTaken;

    #[async_trait]
    impl EntitlementStore for LastSlotTaken {
        async fn free_usage(&self, _: &str) -> Result<Option<u32>, EntitlementError> {
            Ok(Some(FREE_USAGE_LIMIT - 1))
        }

        async fn initialize_free_usage(&self, _: &str) -> Result<(), EntitlementError> {
            Ok(())
        }

        async fn reserve_free_usage(
            &self,
            _: &str,
            _: u32,
        ) -> Result<Option<u32>, EntitlementError> {
            Ok(None)
        }

        async fn release_free_usage(&self, _: &str) -> Result<(), EntitlementError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lost_reservation_race_is_quota_exceeded() {
        let g = UsageGate::new(Arc::new(LastSlotTaken), FREE_USAGE_LIMIT);
        let result = g.admit(&free_user("u1"), Access::Metered).await;
        assert!(matches!(result, Err(AppError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn test_premium_release_is_noop() {
        let store = Arc::new(MemoryEntitlementStore::failing());
        let g = gate(&store);

        let permit = g.admit(&premium_user("p1"), Access::Metered).await.unwrap();
        g.release(permit).await;
        assert_eq!(store.calls(), 0);
    }
}
