//! Daily usage identity and quota rules.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// Daily quota for anonymous (IP-keyed) identities.
pub const ANONYMOUS_DAILY_QUOTA: u32 = 10;

/// Daily quota for authenticated users.
pub const USER_DAILY_QUOTA: u32 = 50;

/// The identity a usage counter is keyed by: an authenticated user id, or
/// the request source IP for anonymous traffic. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identity {
    User(UserId),
    Anonymous(String),
}

impl Identity {
    /// Stable string form used as the counter key.
    pub fn key(&self) -> String {
        match self {
            Identity::User(id) => format!("user:{}", id),
            Identity::Anonymous(ip) => format!("ip:{}", ip),
        }
    }

    /// Daily quota for this identity class.
    pub fn daily_quota(&self) -> u32 {
        match self {
            Identity::User(_) => USER_DAILY_QUOTA,
            Identity::Anonymous(_) => ANONYMOUS_DAILY_QUOTA,
        }
    }

    /// Returns true once `count` turns exhaust the quota.
    pub fn quota_reached(&self, count: u32) -> bool {
        count >= self.daily_quota()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Identity {
        Identity::User(UserId::new("u-1").unwrap())
    }

    fn anon() -> Identity {
        Identity::Anonymous("203.0.113.7".to_string())
    }

    #[test]
    fn keys_do_not_collide_across_classes() {
        let same_value = Identity::User(UserId::new("203.0.113.7").unwrap());
        assert_ne!(same_value.key(), anon().key());
    }

    #[test]
    fn quotas_differ_by_class() {
        assert_eq!(user().daily_quota(), USER_DAILY_QUOTA);
        assert_eq!(anon().daily_quota(), ANONYMOUS_DAILY_QUOTA);
    }

    #[test]
    fn quota_reached_at_exact_limit() {
        assert!(!anon().quota_reached(ANONYMOUS_DAILY_QUOTA - 1));
        assert!(anon().quota_reached(ANONYMOUS_DAILY_QUOTA));
        assert!(anon().quota_reached(ANONYMOUS_DAILY_QUOTA + 1));
    }
}
