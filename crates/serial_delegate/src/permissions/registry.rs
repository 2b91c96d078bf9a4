//! Browsing context to permission store registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::frame::BrowsingContextId;
use crate::lock_unpoisoned;
use crate::permissions::store::SerialPermissionStore;
use crate::port::PortManager;

/// Resolves a browsing context to its permission store
///
/// Returns `None` when the context is unknown or already shut down. The
/// delegate calls this on every operation and never caches the result.
pub trait PermissionStoreProvider: Send + Sync {
    /// Store for `context`, if it still exists
    fn store_for(&self, context: &BrowsingContextId) -> Option<Arc<SerialPermissionStore>>;
}

/// In-memory [`PermissionStoreProvider`]
///
/// The host creates a store when a browsing context starts and shuts it down
/// when the context is destroyed.
///
/// # Example
///
/// ```
/// use serial_delegate::frame::BrowsingContextId;
/// use serial_delegate::permissions::{PermissionStoreProvider, PermissionStoreRegistry};
/// use serial_delegate::port::{PortManager, SerialPortInfo};
/// use serial_delegate::error::SerialError;
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct NoPorts;
///
/// #[async_trait]
/// impl PortManager for NoPorts {
///     async fn get_devices(&self) -> Result<Vec<SerialPortInfo>, SerialError> {
///         Ok(vec![])
///     }
/// }
///
/// let registry = PermissionStoreRegistry::new();
/// let context = BrowsingContextId::new();
///
/// registry.create_for_context(context, Arc::new(NoPorts));
/// assert!(registry.store_for(&context).is_some());
///
/// registry.shutdown_context(&context);
/// assert!(registry.store_for(&context).is_none());
/// ```
#[derive(Default)]
pub struct PermissionStoreRegistry {
    stores: Mutex<HashMap<BrowsingContextId, Arc<SerialPermissionStore>>>,
}

impl PermissionStoreRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the store for `context`, or return the existing one
    pub fn create_for_context(
        &self,
        context: BrowsingContextId,
        port_manager: Arc<dyn PortManager>,
    ) -> Arc<SerialPermissionStore> {
        let mut stores = lock_unpoisoned(&self.stores);
        let store = stores.entry(context).or_insert_with(|| {
            debug!("Creating serial permission store for {}", context);
            Arc::new(SerialPermissionStore::new(port_manager))
        });
        Arc::clone(store)
    }

    /// Drop the registry's store for `context`
    ///
    /// Callers holding an `Arc` from earlier keep a working store; new
    /// lookups return `None`. Returns the removed store, if any.
    pub fn shutdown_context(
        &self,
        context: &BrowsingContextId,
    ) -> Option<Arc<SerialPermissionStore>> {
        let removed = lock_unpoisoned(&self.stores).remove(context);
        if removed.is_some() {
            debug!("Shut down serial permission store for {}", context);
        }
        removed
    }

    /// Number of live stores
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.stores).len()
    }

    /// True if no stores are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PermissionStoreProvider for PermissionStoreRegistry {
    fn store_for(&self, context: &BrowsingContextId) -> Option<Arc<SerialPermissionStore>> {
        lock_unpoisoned(&self.stores).get(context).cloned()
    }
}
