//! Shared application state and the per-session checkout registry.

use std::collections::HashMap;
use std::sync::Arc;

use checkout::{CheckoutCoordinator, CheckoutError, InMemoryPaymentGateway};
use domain::Catalog;
use history::OrderHistoryReader;
use order_store::OrderStore;
use tokio::sync::RwLock;

/// Checkout coordinator for one shopping session.
pub type SessionCheckout<S> = CheckoutCoordinator<S, InMemoryPaymentGateway>;

/// Coordinators keyed by session id, created on first cart or checkout write
/// and dropped when the session ends.
pub struct SessionRegistry<S: OrderStore + Clone> {
    store: S,
    gateway: InMemoryPaymentGateway,
    sessions: RwLock<HashMap<String, Arc<SessionCheckout<S>>>>,
}

impl<S: OrderStore + Clone> SessionRegistry<S> {
    pub fn new(store: S, gateway: InMemoryPaymentGateway) -> Self {
        Self {
            store,
            gateway,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session's coordinator, creating an empty one if needed.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<SessionCheckout<S>> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, "opening session");
            Arc::new(CheckoutCoordinator::new(
                self.store.clone(),
                self.gateway.clone(),
            ))
        });
        Arc::clone(session)
    }

    /// Returns the session's coordinator without opening a new session.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionCheckout<S>>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Ends a session, dropping its cart and checkout state.
    ///
    /// Refused while a checkout is in flight or a captured payment still
    /// awaits its order. Returns `false` if the session was not open.
    pub async fn end(&self, session_id: &str) -> Result<bool, CheckoutError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(session_id) else {
            return Ok(false);
        };

        let status = session.status().await;
        if status.state.is_in_flight() {
            return Err(CheckoutError::InProgress {
                state: status.state,
            });
        }
        if let Some(reference) = status.pending_reference {
            return Err(CheckoutError::CommitPending { reference });
        }

        sessions.remove(session_id);
        tracing::debug!(session_id, "session ended");
        Ok(true)
    }

    /// Number of open sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore + Clone> {
    pub catalog: Arc<dyn Catalog>,
    pub sessions: SessionRegistry<S>,
    pub history: OrderHistoryReader<S>,
    /// Payment gateway shared by every session's coordinator.
    pub gateway: InMemoryPaymentGateway,
    pub default_page_size: usize,
}
