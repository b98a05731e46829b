//! Server state and configuration.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::delivery::DeliveryClient;
use crate::layout::LayoutStore;
use crate::session::Session;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

/// Application state shared across handlers.
///
/// The session sits behind one async mutex: a handler that renders or sends
/// holds it for the whole operation, so only one composition is in flight.
pub struct AppState {
    pub session: Mutex<Session>,
    pub delivery: Arc<dyn DeliveryClient>,
    pub layout_store: LayoutStore,
}

impl AppState {
    pub fn new(session: Session, delivery: Arc<dyn DeliveryClient>, layout_store: LayoutStore) -> Self {
        Self {
            session: Mutex::new(session),
            delivery,
            layout_store,
        }
    }
}
