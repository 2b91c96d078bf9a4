//! Per-browsing-context serial permission store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use crate::frame::OriginPair;
use crate::lock_unpoisoned;
use crate::port::{PersistentPortId, PortManager, PortToken, SerialPortInfo};

/// Receives port and permission change notifications from a store
///
/// Every method has an empty default so observers only implement what they
/// care about.
///
/// # Example
///
/// ```
/// use serial_delegate::permissions::PortObserver;
/// use serial_delegate::port::SerialPortInfo;
///
/// struct LogRemovals;
///
/// impl PortObserver for LogRemovals {
///     fn on_port_removed(&self, port: &SerialPortInfo) {
///         println!("port gone: {}", port.path.display());
///     }
/// }
/// ```
pub trait PortObserver: Send + Sync {
    /// A port was connected
    fn on_port_added(&self, _port: &SerialPortInfo) {}

    /// A port was disconnected
    fn on_port_removed(&self, _port: &SerialPortInfo) {}

    /// The connection to the device service was lost
    fn on_port_manager_connection_error(&self) {}

    /// A grant for `origins` was revoked
    fn on_permission_revoked(&self, _origins: &OriginPair) {}
}

#[derive(Default)]
struct Grants {
    /// Grants that last until the device disconnects
    ephemeral: HashMap<OriginPair, HashSet<PortToken>>,
    /// Grants keyed by device serial number, surviving reconnects
    persistent: HashMap<OriginPair, HashSet<PersistentPortId>>,
    /// Ports the store has heard about and not yet seen removed
    known_ports: HashMap<PortToken, SerialPortInfo>,
}

/// Record of which origin pairs may open which serial ports
///
/// One store exists per browsing context. It owns the context's
/// [`PortManager`] handle and its observer list, and tracks two kinds of
/// grants:
///
/// - **Ephemeral** grants are keyed by [`PortToken`] and are dropped when the
///   port disconnects or the device service connection is lost.
/// - **Persistent** grants are keyed by [`PersistentPortId`] and are only
///   recorded for ports that report a USB serial number.
///
/// # Thread Safety
///
/// Grants and observers live behind separate `std::sync::Mutex`es. Observer
/// callbacks run after the locks are released, so an observer may call back
/// into the store.
///
/// # Example
///
/// ```
/// use serial_delegate::frame::{Origin, OriginPair};
/// use serial_delegate::permissions::SerialPermissionStore;
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
/// let store = SerialPermissionStore::new(Arc::new(NoPorts));
/// let origins = OriginPair::new(
///     Origin::parse("https://app.example").unwrap(),
///     Origin::parse("https://app.example").unwrap(),
/// );
/// let port = SerialPortInfo::new("/dev/ttyUSB0");
///
/// assert!(!store.has_port_permission(&origins, &port));
/// store.grant_port_permission(&origins, &port);
/// assert!(store.has_port_permission(&origins, &port));
/// ```
pub struct SerialPermissionStore {
    port_manager: Arc<dyn PortManager>,
    grants: Mutex<Grants>,
    observers: Mutex<Vec<Arc<dyn PortObserver>>>,
}

impl SerialPermissionStore {
    /// Create an empty store backed by `port_manager`
    pub fn new(port_manager: Arc<dyn PortManager>) -> Self {
        Self {
            port_manager,
            grants: Mutex::new(Grants::default()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The device service handle owned by this store
    pub fn port_manager(&self) -> Arc<dyn PortManager> {
        Arc::clone(&self.port_manager)
    }

    /// Grant `origins` access to `port`
    ///
    /// Always records an ephemeral grant; also records a persistent grant
    /// when the port has a [`PersistentPortId`].
    pub fn grant_port_permission(&self, origins: &OriginPair, port: &SerialPortInfo) {
        let mut grants = lock_unpoisoned(&self.grants);
        grants
            .ephemeral
            .entry(origins.clone())
            .or_default()
            .insert(port.token);
        if let Some(persistent_id) = port.persistent_id() {
            grants
                .persistent
                .entry(origins.clone())
                .or_default()
                .insert(persistent_id);
        }
        grants.known_ports.insert(port.token, port.clone());
        debug!("Granted {} to {}", port.path.display(), origins);
    }

    /// Check whether `origins` holds a grant for `port`
    pub fn has_port_permission(&self, origins: &OriginPair, port: &SerialPortInfo) -> bool {
        let grants = lock_unpoisoned(&self.grants);
        if grants
            .ephemeral
            .get(origins)
            .is_some_and(|tokens| tokens.contains(&port.token))
        {
            return true;
        }
        match port.persistent_id() {
            Some(id) => grants
                .persistent
                .get(origins)
                .is_some_and(|ids| ids.contains(&id)),
            None => false,
        }
    }

    /// Remove any grant `origins` holds for `port`
    ///
    /// Returns `true` if something was revoked. Observers are told only when
    /// a grant actually existed.
    pub fn revoke_port_permission(&self, origins: &OriginPair, port: &SerialPortInfo) -> bool {
        let revoked = {
            let mut grants = lock_unpoisoned(&self.grants);
            let mut revoked = false;
            if let Some(tokens) = grants.ephemeral.get_mut(origins) {
                revoked |= tokens.remove(&port.token);
                if tokens.is_empty() {
                    grants.ephemeral.remove(origins);
                }
            }
            if let Some(id) = port.persistent_id() {
                if let Some(ids) = grants.persistent.get_mut(origins) {
                    revoked |= ids.remove(&id);
                    if ids.is_empty() {
                        grants.persistent.remove(origins);
                    }
                }
            }
            revoked
        };

        if revoked {
            debug!("Revoked {} from {}", port.path.display(), origins);
            for observer in self.observer_snapshot() {
                observer.on_permission_revoked(origins);
            }
        }
        revoked
    }

    /// Known ports that `origins` currently holds a grant for
    pub fn granted_ports(&self, origins: &OriginPair) -> Vec<SerialPortInfo> {
        let grants = lock_unpoisoned(&self.grants);
        let tokens = grants.ephemeral.get(origins);
        let ids = grants.persistent.get(origins);
        grants
            .known_ports
            .values()
            .filter(|port| {
                tokens.is_some_and(|t| t.contains(&port.token))
                    || port
                        .persistent_id()
                        .is_some_and(|id| ids.is_some_and(|i| i.contains(&id)))
            })
            .cloned()
            .collect()
    }

    /// Register an observer
    pub fn add_port_observer(&self, observer: Arc<dyn PortObserver>) {
        lock_unpoisoned(&self.observers).push(observer);
    }

    /// Unregister an observer; unknown observers are ignored
    pub fn remove_port_observer(&self, observer: &Arc<dyn PortObserver>) {
        let target = Arc::as_ptr(observer) as *const ();
        lock_unpoisoned(&self.observers).retain(|o| Arc::as_ptr(o) as *const () != target);
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        lock_unpoisoned(&self.observers).len()
    }

    /// Device service reported a new port
    pub fn on_port_added(&self, port: &SerialPortInfo) {
        lock_unpoisoned(&self.grants)
            .known_ports
            .insert(port.token, port.clone());
        trace!("Port added: {}", port.path.display());
        for observer in self.observer_snapshot() {
            observer.on_port_added(port);
        }
    }

    /// Device service reported a port disconnecting
    ///
    /// Ephemeral grants for the port's token are dropped; persistent grants
    /// stay so the device is recognized when it comes back.
    pub fn on_port_removed(&self, port: &SerialPortInfo) {
        {
            let mut grants = lock_unpoisoned(&self.grants);
            grants.known_ports.remove(&port.token);
            grants.ephemeral.retain(|_, tokens| {
                tokens.remove(&port.token);
                !tokens.is_empty()
            });
        }
        trace!("Port removed: {}", port.path.display());
        for observer in self.observer_snapshot() {
            observer.on_port_removed(port);
        }
    }

    /// Connection to the device service was lost
    ///
    /// Tokens are meaningless after a reconnect, so every ephemeral grant and
    /// every known port is forgotten.
    pub fn on_port_manager_connection_error(&self) {
        {
            let mut grants = lock_unpoisoned(&self.grants);
            grants.ephemeral.clear();
            grants.known_ports.clear();
        }
        debug!("Port manager connection lost, ephemeral grants cleared");
        for observer in self.observer_snapshot() {
            observer.on_port_manager_connection_error();
        }
    }

    fn observer_snapshot(&self) -> Vec<Arc<dyn PortObserver>> {
        lock_unpoisoned(&self.observers).clone()
    }
}
