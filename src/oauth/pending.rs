use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const STATE_TTL: Duration = Duration::minutes(10);

/// One-time nonces for in-flight OAuth handshakes, keyed per request so
/// concurrent logins cannot observe each other's outcome.
#[derive(Clone, Default)]
pub struct PendingStates(Arc<Mutex<HashMap<String, OffsetDateTime>>>);

impl PendingStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a nonce for a new handshake; stale entries are purged on the way.
    pub fn issue(&self) -> String {
        self.issue_at(OffsetDateTime::now_utc())
    }

    fn issue_at(&self, now: OffsetDateTime) -> String {
        let nonce = Uuid::new_v4().to_string();
        let mut map = self.lock();
        map.retain(|_, issued| *issued + STATE_TTL > now);
        map.insert(nonce.clone(), now);
        nonce
    }

    /// Redeem a nonce exactly once; unknown or expired nonces fail.
    pub fn consume(&self, nonce: &str) -> bool {
        match self.lock().remove(nonce) {
            Some(issued) => issued + STATE_TTL > OffsetDateTime::now_utc(),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OffsetDateTime>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_consumes_exactly_once() {
        let states = PendingStates::new();
        let nonce = states.issue();
        assert!(states.consume(&nonce));
        assert!(!states.consume(&nonce));
    }

    #[test]
    fn unknown_nonce_is_rejected() {
        let states = PendingStates::new();
        assert!(!states.consume("never-issued"));
    }

    #[test]
    fn expired_nonce_is_rejected() {
        let states = PendingStates::new();
        let nonce = states.issue_at(OffsetDateTime::now_utc() - Duration::minutes(11));
        assert!(!states.consume(&nonce));
    }

    #[test]
    fn issuing_purges_stale_entries() {
        let states = PendingStates::new();
        let stale = states.issue_at(OffsetDateTime::now_utc() - Duration::minutes(11));
        let fresh = states.issue();
        assert!(!states.consume(&stale));
        assert!(states.consume(&fresh));
    }
}
