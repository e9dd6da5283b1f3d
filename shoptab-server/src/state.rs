//! Application state shared across all request handlers.

use shoptab_core::reconciler::Reconciler;
use shoptab_core::store::AirtableStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
/// There is no mutable state here: the remote store is the only state the
/// service has.
#[derive(Clone)]
pub struct AppState {
    /// The order reconciler, bound to its Airtable-backed store.
    pub reconciler: Arc<Reconciler<AirtableStore>>,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: Arc<[u8]>,
}

impl AppState {
    pub fn new(reconciler: Reconciler<AirtableStore>, webhook_secret: Vec<u8>) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            webhook_secret: Arc::from(webhook_secret.into_boxed_slice()),
        }
    }
}
