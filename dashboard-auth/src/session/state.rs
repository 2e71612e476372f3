use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Unauthenticated --sign-in ok--> Authenticated
/// Authenticated --token stale--> Refreshing --ok--> Authenticated
///                                Refreshing --no access token / failure--> Expired
/// Authenticated | Expired --sign-out--> Unauthenticated
/// Authenticated --idle past max age--> Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated,
    Refreshing,
    Expired,
}

impl SessionState {
    /// Whether a token is held that may still yield an access token.
    pub fn has_session(self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Refreshing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
            SessionState::Expired => "expired",
        };
        f.write_str(label)
    }
}
