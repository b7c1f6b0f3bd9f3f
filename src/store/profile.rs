//! User records and presence policy
//!
//! Profiles live in the shared `profiles` table. The messaging core reads
//! them to render the contact directory and mutates only the presence
//! fields of the current user's own row (via the heartbeat).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How many minutes an `is_active` flag is trusted after the last heartbeat.
///
/// A client that goes away without a final write leaves `is_active = true`
/// behind forever, so readers must treat the flag as stale once the
/// heartbeat stops arriving.
pub const ONLINE_FRESHNESS_MINUTES: i64 = 5;

/// Threshold in minutes for the "recently active" directory filter
pub const RECENTLY_ACTIVE_MINUTES: i64 = 30;

/// A user record in the shared `profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique user identifier
    pub id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Account email, used for exact-match contact lookup
    pub email: String,
    /// Avatar image reference, if the user has set one
    pub avatar_url: Option<String>,
    /// Self-reported activity flag, written by the heartbeat
    pub is_active: bool,
    /// Timestamp of the last heartbeat write
    pub last_active: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile with presence fields zeroed out.
    ///
    /// `last_active` starts at the Unix epoch, which reads as "never"
    /// under both presence policies.
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            avatar_url: None,
            is_active: false,
            last_active: DateTime::UNIX_EPOCH,
        }
    }

    /// Full display name ("First Last")
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the user counts as online at `now`.
    ///
    /// `is_active` alone is not authoritative: the flag is honored only
    /// while the last heartbeat is within [`ONLINE_FRESHNESS_MINUTES`].
    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now - self.last_active <= Duration::minutes(ONLINE_FRESHNESS_MINUTES)
    }

    /// Whether the user counts as online right now
    pub fn is_online(&self) -> bool {
        self.is_online_at(Utc::now())
    }

    /// Whether the user was active within the last 30 minutes, regardless
    /// of the `is_active` flag
    pub fn is_recently_active_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_active <= Duration::minutes(RECENTLY_ACTIVE_MINUTES)
    }

    /// Whether the user was active within the last 30 minutes
    pub fn is_recently_active(&self) -> bool {
        self.is_recently_active_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_active_at(last_active: DateTime<Utc>) -> Profile {
        let mut profile = Profile::new("u1", "Ada", "Lovelace", "ada@example.com");
        profile.is_active = true;
        profile.last_active = last_active;
        profile
    }

    #[test]
    fn test_online_with_fresh_heartbeat() {
        let now = Utc::now();
        let profile = profile_active_at(now - Duration::minutes(1));
        assert!(profile.is_online_at(now));
    }

    #[test]
    fn test_stale_active_flag_is_not_online() {
        let now = Utc::now();
        let profile = profile_active_at(now - Duration::minutes(ONLINE_FRESHNESS_MINUTES + 1));
        assert!(
            !profile.is_online_at(now),
            "is_active must not be trusted past the freshness window"
        );
    }

    #[test]
    fn test_inactive_flag_is_never_online() {
        let now = Utc::now();
        let mut profile = profile_active_at(now);
        profile.is_active = false;
        assert!(!profile.is_online_at(now));
    }

    #[test]
    fn test_recently_active_ignores_active_flag() {
        let now = Utc::now();
        let mut profile = profile_active_at(now - Duration::minutes(10));
        profile.is_active = false;
        assert!(profile.is_recently_active_at(now));
    }

    #[test]
    fn test_recently_active_threshold() {
        let now = Utc::now();
        let profile = profile_active_at(now - Duration::minutes(RECENTLY_ACTIVE_MINUTES + 1));
        assert!(!profile.is_recently_active_at(now));
    }

    #[test]
    fn test_display_name() {
        let profile = Profile::new("u1", "Ada", "Lovelace", "ada@example.com");
        assert_eq!(profile.display_name(), "Ada Lovelace");
    }
}
