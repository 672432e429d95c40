//! In-memory holder of the session's current token record.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::models::TokenRecord;

/// Default safety margin before `expires_at` (30 seconds).
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 30;

/// Default safety margin as a [`Duration`].
pub fn default_skew() -> Duration {
    Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS)
}

/// Single source of truth for "is the current token usable".
///
/// `set` replaces the whole record under a write lock, so readers see either
/// the previous record or the new one.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<TokenRecord>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a previously persisted record.
    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            current: RwLock::new(Some(record)),
        }
    }

    pub fn get(&self) -> Option<TokenRecord> {
        self.read().clone()
    }

    pub fn set(&self, record: TokenRecord) {
        *self.write() = Some(record);
    }

    /// Remove and return the current record.
    pub fn clear(&self) -> Option<TokenRecord> {
        self.write().take()
    }

    /// True when `now + skew >= expires_at`, or when no record is held.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.read()
            .as_ref()
            .is_none_or(|record| record.is_expired_at(now, skew))
    }

    // A panic while holding the lock cannot leave a half-written record, so
    // a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Option<TokenRecord>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenRecord>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn record(access_token: &str, expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            token_type: "Bearer".into(),
            scope: None,
        }
    }

    #[test]
    fn get_returns_none_when_empty() {
        let store = TokenStore::new();
        assert!(store.get().is_none());
        assert!(store.is_expired(Utc::now(), default_skew()));
    }

    #[test]
    fn set_overwrites_previous_record() {
        let store = TokenStore::new();
        let expires_at = Utc::now() + Duration::hours(1);
        store.set(record("first", expires_at));
        store.set(record("second", expires_at));
        assert_eq!(store.get().unwrap().access_token, "second");
    }

    #[test]
    fn clear_returns_and_removes_record() {
        let store = TokenStore::with_record(record("a", Utc::now()));
        assert_eq!(store.clear().unwrap().access_token, "a");
        assert!(store.get().is_none());
    }

    #[test]
    fn is_expired_boundary() {
        let now = Utc::now();
        let skew = default_skew();
        let store = TokenStore::with_record(record("a", now + skew));

        // now + skew == expires_at
        assert!(store.is_expired(now, skew));
        assert!(!store.is_expired(now - Duration::milliseconds(1), skew));
        assert!(store.is_expired(now + Duration::seconds(1), skew));
    }

    #[test]
    fn is_expired_with_zero_skew() {
        let now = Utc::now();
        let store = TokenStore::with_record(record("a", now + Duration::seconds(10)));
        assert!(!store.is_expired(now, Duration::zero()));
        assert!(store.is_expired(now + Duration::seconds(10), Duration::zero()));
    }

    #[test]
    fn readers_never_see_partial_records() {
        let store = Arc::new(TokenStore::new());
        let expires_at = Utc::now() + Duration::hours(1);

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    store.set(TokenRecord {
                        access_token: format!("access-{i}"),
                        refresh_token: Some(format!("refresh-{i}")),
                        expires_at,
                        token_type: "Bearer".into(),
                        scope: None,
                    });
                }
            })
        };

        for _ in 0..500 {
            if let Some(r) = store.get() {
                let n = r.access_token.trim_start_matches("access-");
                assert_eq!(r.refresh_token.as_deref(), Some(format!("refresh-{n}").as_str()));
            }
        }
        writer.join().unwrap();
    }
}
