use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::{AuthError, AuthSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub session: AuthSession,
    pub expires_at: DateTime<Utc>,
}

/// In-memory token cache. Entries expire lazily on lookup or on
/// [`purge_expired`](SessionCache::purge_expired).
#[derive(Debug)]
pub struct SessionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedSession>>,
}

impl SessionCache {
    /// TTLs beyond what chrono can represent saturate; negative ones act as zero.
    pub fn new(ttl_minutes: i64) -> Self {
        let ttl = Duration::try_minutes(ttl_minutes)
            .unwrap_or(Duration::MAX)
            .max(Duration::zero());
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self, session: AuthSession) -> CachedSession {
        self.store_at(session, Utc::now())
    }

    pub fn store_at(&self, session: AuthSession, now: DateTime<Utc>) -> CachedSession {
        let cached = CachedSession {
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            session,
        };
        let mut entries = self.entries.lock().expect("session cache mutex poisoned");
        entries.insert(cached.session.token.clone(), cached.clone());
        cached
    }

    pub fn get(&self, token: &str) -> Result<AuthSession, AuthError> {
        self.get_at(token, Utc::now())
    }

    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Result<AuthSession, AuthError> {
        let mut entries = self.entries.lock().expect("session cache mutex poisoned");
        match entries.get(token) {
            Some(cached) if cached.expires_at > now => Ok(cached.session.clone()),
            Some(_) => {
                entries.remove(token);
                Err(AuthError::SessionExpired)
            }
            None => Err(AuthError::SessionExpired),
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        let mut entries = self.entries.lock().expect("session cache mutex poisoned");
        entries.remove(token).is_some()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().expect("session cache mutex poisoned");
        let before = entries.len();
        entries.retain(|_, cached| cached.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("session cache mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;

    fn session(token: &str) -> AuthSession {
        AuthSession {
            token: token.to_string(),
            uid: format!("uid-{token}"),
            email: "evaluador@motocredito.pe".to_string(),
            display_name: Some("Evaluador".to_string()),
            rol: UserRole::Evaluador,
        }
    }

    #[test]
    fn sessions_expire_after_ttl() {
        let cache = SessionCache::new(30);
        let now = Utc::now();
        cache.store_at(session("tok-1"), now);

        assert!(cache.get_at("tok-1", now + Duration::minutes(29)).is_ok());
        assert_eq!(
            cache.get_at("tok-1", now + Duration::minutes(31)),
            Err(AuthError::SessionExpired)
        );
        assert!(cache.is_empty(), "expired entry is evicted on lookup");
    }

    #[test]
    fn purge_and_revoke_remove_entries() {
        let cache = SessionCache::new(10);
        let now = Utc::now();
        cache.store_at(session("old"), now - Duration::minutes(20));
        cache.store_at(session("fresh"), now);
        cache.store_at(session("gone"), now);

        assert_eq!(cache.purge_expired(now), 1);
        assert!(cache.revoke("gone"));
        assert!(!cache.revoke("gone"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn huge_ttls_saturate_instead_of_overflowing() {
        let cache = SessionCache::new(1_000_000_000_000);
        let now = Utc::now();
        let cached = cache.store_at(session("long"), now);

        assert_eq!(cached.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(cache.get_at("long", now + Duration::days(365)).is_ok());

        let cache = SessionCache::new(i64::MAX);
        assert!(cache.get("missing").is_err());
        cache.store(session("max"));
        assert!(cache.get("max").is_ok());
    }

    #[test]
    fn negative_ttls_expire_immediately() {
        let cache = SessionCache::new(-5);
        let now = Utc::now();
        cache.store_at(session("neg"), now);
        assert_eq!(cache.get_at("neg", now), Err(AuthError::SessionExpired));
    }
}
