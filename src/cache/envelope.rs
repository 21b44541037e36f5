use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::staleness::StalenessPolicy;

/// A cached payload with its write timestamp.
///
/// `cached_at` is stamped when the envelope is created and is the only
/// staleness signal the caches use; payloads are never stored pre-dated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    #[serde(rename = "cachedAt")]
    pub cached_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            cached_at: Utc::now(),
            payload,
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    pub fn is_stale(&self, policy: &StalenessPolicy, online: bool) -> bool {
        policy.is_stale(self.age(), online)
    }

    /// Human-readable age for status surfaces.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Covers clock skew (negative ages) as well
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn backdated(minutes: i64) -> CacheEnvelope<u32> {
        let mut env = CacheEnvelope::new(0);
        env.cached_at = Utc::now() - Duration::minutes(minutes);
        env
    }

    #[test]
    fn test_new_envelope_is_just_now() {
        let env = CacheEnvelope::new(vec![1, 2, 3]);
        assert!(env.age_minutes() <= 1);
        assert_eq!(env.age_display(), "just now");
    }

    #[test]
    fn test_age_display_buckets() {
        assert_eq!(backdated(5).age_display(), "5m ago");
        assert_eq!(backdated(61).age_display(), "1h ago");
        // 1h35m rounds up
        assert_eq!(backdated(95).age_display(), "2h ago");
        assert_eq!(backdated(1441).age_display(), "1d ago");
        // 1d 13h rounds up
        assert_eq!(backdated(1440 + 13 * 60).age_display(), "2d ago");
    }

    #[test]
    fn test_clock_skew_reads_as_just_now() {
        let mut env = CacheEnvelope::new(0);
        env.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(env.age_display(), "just now");
    }
}
