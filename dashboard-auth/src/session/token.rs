use chrono::{DateTime, Duration, Utc};
use entity::users;
use secrecy::SecretString;

/// Tokens and identity held by an established session.
#[derive(Clone)]
pub struct SessionToken {
    pub user: users::Model,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Access token is considered stale from this instant.
    pub expires_at: DateTime<Utc>,
    /// Last time the session handed out a token.
    pub last_seen: DateTime<Utc>,
}

impl SessionToken {
    pub fn issued(
        user: users::Model,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user,
            access_token,
            refresh_token,
            expires_at: now + lifetime,
            last_seen: now,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// True once the session has gone unused for longer than `max_idle`.
    pub fn is_idle_expired(&self, now: DateTime<Utc>, max_idle: Option<Duration>) -> bool {
        max_idle.is_some_and(|max_idle| now - self.last_seen > max_idle)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user", &self.user.id)
            .field("expires_at", &self.expires_at)
            .field("last_seen", &self.last_seen)
            .finish_non_exhaustive()
    }
}
