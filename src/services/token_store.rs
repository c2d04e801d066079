//! Client-side persisted token storage
//!
//! The visitor token lives with the client. [`TokenStore`] abstracts the
//! place it is kept so that the recorder can run against request cookies in
//! the HTTP layer and against [`MemoryTokenStore`] elsewhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
pub use cookie::SameSite;

/// Attributes applied when a token is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    pub expires_at: DateTime<Utc>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl PersistOptions {
    /// Site-wide, same-site-lax token expiring `max_age_days` after `now`
    pub fn site_wide(now: DateTime<Utc>, max_age_days: i64, secure: bool) -> Self {
        Self {
            expires_at: now + Duration::days(max_age_days),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure,
        }
    }
}

/// Key/value storage for client-held tokens
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, options: &PersistOptions);
    fn clear(&self, key: &str);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct StoredToken {
    value: String,
    options: PersistOptions,
}

/// Process-local token store honouring expiry
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, StoredToken>>,
    writes: AtomicUsize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(key: &str, value: &str, options: PersistOptions) -> Self {
        let store = Self::new();
        lock(&store.tokens).insert(
            key.to_string(),
            StoredToken {
                value: value.to_string(),
                options,
            },
        );
        store
    }

    /// Options the token under `key` was written with
    pub fn options(&self, key: &str) -> Option<PersistOptions> {
        lock(&self.tokens).get(key).map(|t| t.options.clone())
    }

    /// Number of `set` calls seen so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let mut tokens = lock(&self.tokens);
        match tokens.get(key) {
            Some(token) if token.options.expires_at > Utc::now() => Some(token.value.clone()),
            Some(_) => {
                tokens.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &str, options: &PersistOptions) {
        lock(&self.tokens).insert(
            key.to_string(),
            StoredToken {
                value: value.to_string(),
                options: options.clone(),
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn clear(&self, key: &str) {
        lock(&self.tokens).remove(key);
    }
}

/// Token store backed by the cookies of one HTTP request.
///
/// Writes accumulate in the jar, which is turned back into `Set-Cookie`
/// headers with [`CookieTokenStore::into_jar`].
pub struct CookieTokenStore {
    jar: Mutex<CookieJar>,
}

impl CookieTokenStore {
    pub fn new(jar: CookieJar) -> Self {
        Self {
            jar: Mutex::new(jar),
        }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(CookieJar) -> CookieJar) {
        let mut jar = lock(&self.jar);
        let current = std::mem::take(&mut *jar);
        *jar = f(current);
    }
}

impl TokenStore for CookieTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.jar)
            .get(key)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn set(&self, key: &str, value: &str, options: &PersistOptions) {
        let max_age = (options.expires_at - Utc::now()).num_seconds().max(0);
        let mut builder = Cookie::build((key.to_string(), value.to_string()))
            .path(options.path.clone())
            .max_age(cookie::time::Duration::seconds(max_age))
            .same_site(options.same_site)
            .secure(options.secure);
        if let Ok(expires) =
            cookie::time::OffsetDateTime::from_unix_timestamp(options.expires_at.timestamp())
        {
            builder = builder.expires(expires);
        }

        let cookie = builder.build();
        self.update(|jar| jar.add(cookie));
    }

    fn clear(&self, key: &str) {
        let removal = Cookie::build((key.to_string(), String::new())).path("/").build();
        self.update(|jar| jar.remove(removal));
    }
}
