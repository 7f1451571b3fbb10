//! Whether the shopper's drawer is displayed.
//!
//! Kept per session: requesting the drawer opens it and the empty state's
//! "continue shopping" action closes it. Nothing else resets it.

use tower_sessions::Session;
use tracing::warn;

use crate::models::session_keys;

/// Whether the drawer is open for this session.
pub async fn is_open(session: &Session) -> bool {
    session
        .get::<bool>(session_keys::DRAWER_OPEN)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// Open or close the drawer for this session.
///
/// A session store failure is logged; the drawer just keeps its old state.
pub async fn set_open(session: &Session, open: bool) {
    if let Err(e) = session.insert(session_keys::DRAWER_OPEN, open).await {
        warn!(error = %e, open, "Failed to store drawer visibility");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_closed_by_default() {
        assert!(!is_open(&session()).await);
    }

    #[tokio::test]
    async fn test_toggle() {
        let session = session();
        set_open(&session, true).await;
        assert!(is_open(&session).await);
        set_open(&session, false).await;
        assert!(!is_open(&session).await);
    }
}
