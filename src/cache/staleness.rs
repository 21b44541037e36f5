use chrono::Duration;

/// Consider a feed snapshot stale after 30 minutes.
/// The feed changes slowly enough that half an hour balances freshness
/// against pointless refetches.
pub const FEED_TTL_MINUTES: i64 = 30;

/// Revalidate a visited recipe in the background once it is older than
/// 5 minutes. The cached copy is still rendered immediately.
pub const VISITED_STALE_MINUTES: i64 = 5;

/// When and whether cached data counts as stale.
///
/// `online_only` policies never expire while the device is offline: an old
/// copy beats an empty screen when nothing fresher can be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub ttl: Duration,
    pub online_only: bool,
}

impl StalenessPolicy {
    pub fn new(ttl: Duration, online_only: bool) -> Self {
        Self { ttl, online_only }
    }

    /// TTL applied to the recipe feed: 30 minutes, suspended while offline.
    pub fn feed_default() -> Self {
        Self::new(Duration::minutes(FEED_TTL_MINUTES), true)
    }

    /// Revalidation threshold for visited recipes: 5 minutes, regardless of
    /// connectivity (the consumer decides whether a refetch is possible).
    pub fn visited_default() -> Self {
        Self::new(Duration::minutes(VISITED_STALE_MINUTES), false)
    }

    pub fn is_stale(&self, age: Duration, online: bool) -> bool {
        if self.online_only && !online {
            return false;
        }
        age > self.ttl
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_boundary_is_exclusive() {
        let policy = StalenessPolicy::feed_default();
        assert!(!policy.is_stale(Duration::minutes(30), true));
        assert!(policy.is_stale(Duration::minutes(31), true));
    }

    #[test]
    fn test_online_only_policy_never_expires_offline() {
        let policy = StalenessPolicy::feed_default();
        assert!(policy.is_stale(Duration::days(3), true));
        assert!(!policy.is_stale(Duration::days(3), false));
    }

    #[test]
    fn test_always_policy_ignores_connectivity() {
        let policy = StalenessPolicy::visited_default();
        assert!(policy.is_stale(Duration::minutes(6), false));
        assert!(!policy.is_stale(Duration::minutes(4), false));
    }
}
