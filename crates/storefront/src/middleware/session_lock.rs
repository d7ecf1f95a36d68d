//! Per-session request serialization.
//!
//! Widget events read the session, mutate the cart and write the session
//! back. Two events from one browser must not interleave, or the later write
//! loses the earlier one. This layer sits outside the session layer and holds
//! one lock per session cookie for the whole request, including the session
//! save that happens on the way out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;

type SessionLock = tokio::sync::Mutex<()>;

/// Locks for sessions with a request in flight.
///
/// Entries are dropped once no request holds them.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Weak<SessionLock>>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `session_id`, shared with every other request holding it.
    fn lock_for(&self, session_id: &str) -> Arc<SessionLock> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(SessionLock::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Number of sessions with a live lock.
    #[must_use]
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }
}

/// The session cookie's value, if the request carries one.
fn session_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Run requests of one session one at a time.
///
/// Requests without a session cookie cannot share a session and pass
/// straight through.
pub async fn session_lock_middleware(
    State(locks): State<SessionLocks>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = session_cookie(&request) else {
        return next.run(request).await;
    };

    let _guard = locks.lock_for(&session_id).lock_owned().await;
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_shares_lock() {
        let locks = SessionLocks::new();
        let first = locks.lock_for("abc");
        let second = locks.lock_for("abc");
        let other = locks.lock_for("xyz");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(locks.active(), 2);
    }

    #[test]
    fn test_released_locks_are_dropped() {
        let locks = SessionLocks::new();
        drop(locks.lock_for("abc"));
        let _held = locks.lock_for("xyz");

        assert_eq!(locks.active(), 1);
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_session_cookie_found() {
        let request = Request::builder()
            .header(header::COOKIE, "cart=%5B%5D; cart_session=abc123")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(session_cookie(&request).as_deref(), Some("abc123"));

        let request = Request::builder()
            .header(header::COOKIE, "cart=%5B%5D")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(session_cookie(&request).is_none());
    }

    #[tokio::test]
    async fn test_lock_excludes_second_holder() {
        let locks = SessionLocks::new();
        let guard = locks.lock_for("abc").lock_owned().await;
        assert!(locks.lock_for("abc").try_lock().is_err());
        drop(guard);
        assert!(locks.lock_for("abc").try_lock().is_ok());
    }
}
