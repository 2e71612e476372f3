use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

struct Pending {
    pkce_verifier: String,
    expires_at: DateTime<Utc>,
}

/// Authorization requests awaiting their callback, keyed by the CSRF `state` parameter.
///
/// Each state is single use and lapses after its TTL.
pub struct PendingSignIns {
    entries: Mutex<HashMap<String, Pending>>,
    ttl: Duration,
}

impl PendingSignIns {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Records a verifier and returns the state value to send along with it.
    pub fn start(&self, pkce_verifier: String) -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        let state = URL_SAFE_NO_PAD.encode(random_bytes);
        let now = Utc::now();

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, pending| pending.expires_at > now);
        entries.insert(
            state.clone(),
            Pending {
                pkce_verifier,
                expires_at: now + self.ttl,
            },
        );
        state
    }

    /// Consumes `state`, returning its verifier when it is known and unexpired.
    pub fn finish(&self, state: &str) -> Option<String> {
        let pending = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)?;
        (pending.expires_at > Utc::now()).then_some(pending.pkce_verifier)
    }
}

impl Default for PendingSignIns {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_single_use() {
        let pending = PendingSignIns::new();
        let state = pending.start("verifier".to_string());

        assert_eq!(pending.finish(&state), Some("verifier".to_string()));
        assert_eq!(pending.finish(&state), None);
    }

    #[test]
    fn test_unknown_and_expired_states_are_rejected() {
        let pending = PendingSignIns::with_ttl(Duration::seconds(-1));
        let state = pending.start("verifier".to_string());

        assert_eq!(pending.finish("forged"), None);
        assert_eq!(pending.finish(&state), None);
    }
}
