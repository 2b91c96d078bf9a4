//! The per-host serial delegate
//!
//! [`SerialDelegate`] is the single coordination point between frame-scoped
//! serial requests and the host's permission infrastructure. It:
//!
//! - Owns the map from [`FrameId`] to the frame's live [`ChooserSession`]
//! - Forwards permission queries to the [`SerialPermissionStore`] of the
//!   frame's browsing context, resolved fresh on every call
//! - Applies the chooser capability gate from [`DelegateOptions`]
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      SerialDelegate                       │
//! │                                                           │
//! │  sessions: Mutex<HashMap<FrameId, ChooserSession>>        │
//! │       ↑ owns                          ↓ DelegateHandle    │
//! │  ┌──────────────┐              (weak, checked per use)    │
//! │  │ChooserSession│ ───────────────────────────┘            │
//! │  └──────────────┘                                         │
//! │                                                           │
//! │  FrameHost ──→ BrowsingContextId ──→ PermissionStoreProvider
//! │                                         ↓                 │
//! │                               SerialPermissionStore       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation is synchronous. Sessions are always destroyed after the
//! session map lock is released, because destroying one can run the
//! requester's callback.
//!
//! # Example
//!
//! ```no_run
//! use serial_delegate::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example(frame_host: Arc<dyn FrameHost>, frame: FrameId) -> Result<(), SerialError> {
//! let stores = Arc::new(PermissionStoreRegistry::new());
//! let delegate = SerialDelegate::builder()
//!     .options(DelegateOptions::builder().chooser_enabled(true).build())
//!     .frame_host(frame_host)
//!     .permission_stores(stores)
//!     .build()?;
//!
//! delegate.request_port(frame, vec![SerialPortFilter::vendor(0x2341)], |port| {
//!     println!("selected: {:?}", port.map(|p| p.path));
//! });
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::chooser::{ChooserSession, PortChooser, SerialChooser, SessionId, SessionInfo};
use crate::error::SerialError;
use crate::frame::{FrameId, Origin};
use crate::host::{FrameHost, SerialAccessPolicy};
use crate::lock_unpoisoned;
use crate::options::DelegateOptions;
use crate::permissions::{PermissionStoreProvider, PortObserver, SerialPermissionStore};
use crate::port::{PortManager, SerialPortFilter, SerialPortInfo};

struct DelegateInner {
    options: DelegateOptions,
    frame_host: Arc<dyn FrameHost>,
    stores: Arc<dyn PermissionStoreProvider>,
    access_policy: Arc<dyn SerialAccessPolicy>,
    chooser: Option<Arc<dyn PortChooser>>,
    runtime: Option<Handle>,
    sessions: Mutex<HashMap<FrameId, ChooserSession>>,
}

impl Drop for DelegateInner {
    fn drop(&mut self) {
        let live = lock_unpoisoned(&self.sessions).len();
        debug!("Serial delegate dropped with {} live sessions", live);
    }
}

/// Coordinates serial chooser sessions and permission checks for a host
///
/// Cloning is cheap and yields another handle to the same delegate.
#[derive(Clone)]
pub struct SerialDelegate {
    inner: Arc<DelegateInner>,
}

/// Non-owning back-reference from a session to its delegate
///
/// Never keeps the delegate alive. [`upgrade`](Self::upgrade) returns `None`
/// once the last [`SerialDelegate`] clone is dropped.
#[derive(Clone)]
pub struct DelegateHandle(Weak<DelegateInner>);

impl DelegateHandle {
    /// A handle that was never attached to a delegate
    pub(crate) fn detached() -> Self {
        Self(Weak::new())
    }

    /// Get the delegate back if it is still alive
    pub fn upgrade(&self) -> Option<SerialDelegate> {
        self.0.upgrade().map(|inner| SerialDelegate { inner })
    }

    /// Whether the delegate is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl SerialDelegate {
    /// Create a builder
    pub fn builder() -> SerialDelegateBuilder {
        SerialDelegateBuilder::default()
    }

    /// The options this delegate was built with
    pub fn options(&self) -> &DelegateOptions {
        &self.inner.options
    }

    /// A weak handle to this delegate
    pub fn handle(&self) -> DelegateHandle {
        DelegateHandle(Arc::downgrade(&self.inner))
    }

    /// Ask the user to pick a serial port for `frame`
    ///
    /// With the chooser disabled, `callback` runs immediately with `None` and
    /// no session is created. Otherwise any existing session for `frame` is
    /// destroyed first (its own callback fires with `None`), and a new session
    /// is registered and started. `callback` eventually runs exactly once.
    ///
    /// The returned handle does not control the session; dropping it is a
    /// no-op.
    pub fn request_port<F>(
        &self,
        frame: FrameId,
        filters: Vec<SerialPortFilter>,
        callback: F,
    ) -> SerialChooser
    where
        F: FnOnce(Option<SerialPortInfo>) + Send + 'static,
    {
        if !self.inner.options.chooser_enabled {
            debug!("Serial chooser disabled, {} resolves with no port", frame);
            callback(None);
            return SerialChooser::detached(frame);
        }
        let Some(runtime) = self.inner.runtime.as_ref() else {
            warn!("No runtime for serial chooser, {} resolves with no port", frame);
            callback(None);
            return SerialChooser::detached(frame);
        };

        let previous = lock_unpoisoned(&self.inner.sessions).remove(&frame);
        if let Some(previous) = previous {
            debug!("Replacing chooser session {} for {}", previous.id(), frame);
            drop(previous);
        }

        let session = ChooserSession::new(frame, filters, Box::new(callback), self.handle());
        let id = session.id();
        debug!("Created chooser session {} for {}", id, frame);

        // Spawn only once the entry exists, so a task that ends right away
        // (including one dropped by a shut-down runtime) finds it to finish
        let task = session.task(self.inner.chooser.clone());
        let displaced = lock_unpoisoned(&self.inner.sessions).insert(frame, session);
        // Only possible if a callback re-entered with a request for the same frame
        drop(displaced);

        let task = task.spawn(runtime);
        let mut sessions = lock_unpoisoned(&self.inner.sessions);
        match sessions.get_mut(&frame) {
            Some(session) if session.id() == id => session.attach_task(task),
            // Already finished or replaced
            _ => task.abort(),
        }
        drop(sessions);

        SerialChooser::attached(frame, id)
    }

    /// Whether `frame`'s origin may request serial access at all
    ///
    /// Returns `false` for frames the host no longer knows.
    pub fn can_request_port_permission(&self, frame: &FrameId) -> bool {
        match self.inner.frame_host.committed_origin(frame) {
            Some(origin) => self.inner.access_policy.can_request_serial_access(&origin),
            None => false,
        }
    }

    /// Whether `frame` already holds a grant for `port`
    ///
    /// The grant is looked up under the frame's (requesting, top-level)
    /// origin pair. Unknown frames and unreachable stores answer `false`.
    pub fn has_port_permission(&self, frame: &FrameId, port: &SerialPortInfo) -> bool {
        let Some(origins) = self.inner.frame_host.origin_pair(frame) else {
            return false;
        };
        match self.store_for_frame(frame) {
            Ok(store) => store.has_port_permission(&origins, port),
            Err(e) => {
                debug!("Permission check for {} failed: {}", frame, e);
                false
            }
        }
    }

    /// Record a grant of `port` for `frame`'s origin pair
    pub fn grant_port_permission(
        &self,
        frame: &FrameId,
        port: &SerialPortInfo,
    ) -> Result<(), SerialError> {
        let origins = self
            .inner
            .frame_host
            .origin_pair(frame)
            .ok_or(SerialError::UnknownFrame(*frame))?;
        self.store_for_frame(frame)?
            .grant_port_permission(&origins, port);
        Ok(())
    }

    /// Revoke `frame`'s grant for `port`; `Ok(false)` if there was none
    pub fn revoke_port_permission(
        &self,
        frame: &FrameId,
        port: &SerialPortInfo,
    ) -> Result<bool, SerialError> {
        let origins = self
            .inner
            .frame_host
            .origin_pair(frame)
            .ok_or(SerialError::UnknownFrame(*frame))?;
        Ok(self.store_for_frame(frame)?.revoke_port_permission(&origins, port))
    }

    /// Ports `frame`'s origin pair currently holds grants for
    pub fn granted_ports(&self, frame: &FrameId) -> Result<Vec<SerialPortInfo>, SerialError> {
        let origins = self
            .inner
            .frame_host
            .origin_pair(frame)
            .ok_or(SerialError::UnknownFrame(*frame))?;
        Ok(self.store_for_frame(frame)?.granted_ports(&origins))
    }

    /// The device service handle for `frame`'s browsing context
    pub fn port_manager(&self, frame: &FrameId) -> Result<Arc<dyn PortManager>, SerialError> {
        Ok(self.store_for_frame(frame)?.port_manager())
    }

    /// Register `observer` with the store for `frame`'s browsing context
    pub fn add_port_observer(
        &self,
        frame: &FrameId,
        observer: Arc<dyn PortObserver>,
    ) -> Result<(), SerialError> {
        self.store_for_frame(frame)?.add_port_observer(observer);
        Ok(())
    }

    /// Unregister `observer`
    ///
    /// Observer removal routinely races frame teardown, so a missing frame
    /// or store is silently ignored.
    pub fn remove_port_observer(&self, frame: &FrameId, observer: &Arc<dyn PortObserver>) {
        match self.store_for_frame(frame) {
            Ok(store) => store.remove_port_observer(observer),
            Err(e) => debug!("Skipping observer removal for {}: {}", frame, e),
        }
    }

    /// Snapshot of the live session for `frame`, if any
    pub fn lookup_session(&self, frame: &FrameId) -> Option<SessionInfo> {
        lock_unpoisoned(&self.inner.sessions)
            .get(frame)
            .map(ChooserSession::info)
    }

    /// Destroy the session for `frame`, if any
    ///
    /// Idempotent. A session destroyed before completing fires its callback
    /// with `None`.
    pub fn remove_session(&self, frame: &FrameId) {
        let removed = lock_unpoisoned(&self.inner.sessions).remove(frame);
        if let Some(session) = removed {
            debug!("Removed chooser session {} for {}", session.id(), frame);
            drop(session);
        }
    }

    /// Host notification that `frame` was destroyed
    pub fn frame_destroyed(&self, frame: &FrameId) {
        self.remove_session(frame);
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        lock_unpoisoned(&self.inner.sessions).len()
    }

    /// Remove `frame`'s session only if it is still session `id`
    ///
    /// Called by a finished session; a newer session for the same frame is
    /// left alone.
    pub(crate) fn finish_session(&self, frame: &FrameId, id: SessionId) {
        let finished = {
            let mut sessions = lock_unpoisoned(&self.inner.sessions);
            match sessions.get(frame) {
                Some(session) if session.id() == id => sessions.remove(frame),
                _ => None,
            }
        };
        if let Some(session) = finished {
            debug!("Chooser session {} for {} finished", session.id(), frame);
            drop(session);
        }
    }

    pub(crate) fn committed_origin(&self, frame: &FrameId) -> Option<Origin> {
        self.inner.frame_host.committed_origin(frame)
    }

    fn store_for_frame(&self, frame: &FrameId) -> Result<Arc<SerialPermissionStore>, SerialError> {
        let context = self
            .inner
            .frame_host
            .browsing_context(frame)
            .ok_or(SerialError::UnknownFrame(*frame))?;
        self.inner
            .stores
            .store_for(&context)
            .ok_or(SerialError::StoreUnavailable { context })
    }
}

impl fmt::Debug for SerialDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDelegate")
            .field("options", &self.inner.options)
            .field("sessions", &self.session_count())
            .field("has_chooser", &self.inner.chooser.is_some())
            .finish()
    }
}

/// Builder for [`SerialDelegate`]
///
/// `frame_host` and `permission_stores` are required. Without an
/// `access_policy` every origin may request serial access; without a
/// `chooser` every session resolves to `None`. The runtime defaults to the
/// one the builder is called from and is only required when the chooser is
/// enabled.
#[derive(Default)]
pub struct SerialDelegateBuilder {
    options: DelegateOptions,
    frame_host: Option<Arc<dyn FrameHost>>,
    stores: Option<Arc<dyn PermissionStoreProvider>>,
    access_policy: Option<Arc<dyn SerialAccessPolicy>>,
    chooser: Option<Arc<dyn PortChooser>>,
    runtime: Option<Handle>,
}

impl SerialDelegateBuilder {
    /// Set the delegate options
    pub fn options(mut self, options: DelegateOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the host frame resolver
    pub fn frame_host(mut self, frame_host: Arc<dyn FrameHost>) -> Self {
        self.frame_host = Some(frame_host);
        self
    }

    /// Set the permission store provider
    pub fn permission_stores(mut self, stores: Arc<dyn PermissionStoreProvider>) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Set the coarse serial access policy
    pub fn access_policy(mut self, policy: Arc<dyn SerialAccessPolicy>) -> Self {
        self.access_policy = Some(policy);
        self
    }

    /// Set the port picker UI
    pub fn chooser(mut self, chooser: Arc<dyn PortChooser>) -> Self {
        self.chooser = Some(chooser);
        self
    }

    /// Set the runtime that session tasks are spawned on
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the delegate
    ///
    /// # Errors
    ///
    /// * [`SerialError::MissingCollaborator`] - `frame_host` or `permission_stores` unset
    /// * [`SerialError::NoRuntime`] - chooser enabled and no runtime available
    pub fn build(self) -> Result<SerialDelegate, SerialError> {
        let frame_host = self
            .frame_host
            .ok_or(SerialError::MissingCollaborator("frame_host"))?;
        let stores = self
            .stores
            .ok_or(SerialError::MissingCollaborator("permission_stores"))?;
        let access_policy = self
            .access_policy
            .unwrap_or_else(|| Arc::new(allow_all) as Arc<dyn SerialAccessPolicy>);
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        if self.options.chooser_enabled && runtime.is_none() {
            return Err(SerialError::NoRuntime);
        }

        Ok(SerialDelegate {
            inner: Arc::new(DelegateInner {
                options: self.options,
                frame_host,
                stores,
                access_policy,
                chooser: self.chooser,
                runtime,
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }
}

fn allow_all(_origin: &Origin) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::ChooserRequest;
    use crate::frame::BrowsingContextId;
    use crate::permissions::PermissionStoreRegistry;
    use crate::port::PortToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    struct StaticHost {
        frames: HashMap<FrameId, (BrowsingContextId, Origin, Origin)>,
    }

    impl FrameHost for StaticHost {
        fn browsing_context(&self, frame: &FrameId) -> Option<BrowsingContextId> {
            self.frames.get(frame).map(|(context, _, _)| *context)
        }

        fn committed_origin(&self, frame: &FrameId) -> Option<Origin> {
            self.frames.get(frame).map(|(_, origin, _)| origin.clone())
        }

        fn top_frame_origin(&self, frame: &FrameId) -> Option<Origin> {
            self.frames.get(frame).map(|(_, _, top)| top.clone())
        }
    }

    struct FixedPorts(Vec<SerialPortInfo>);

    #[async_trait]
    impl PortManager for FixedPorts {
        async fn get_devices(&self) -> Result<Vec<SerialPortInfo>, SerialError> {
            Ok(self.0.clone())
        }
    }

    /// Never answers; keeps sessions alive until they are dropped
    struct NeverChooses;

    #[async_trait]
    impl PortChooser for NeverChooses {
        async fn select_port(&self, _request: ChooserRequest) -> Option<PortToken> {
            std::future::pending().await
        }
    }

    struct Fixture {
        delegate: SerialDelegate,
        registry: Arc<PermissionStoreRegistry>,
        frame: FrameId,
        context: BrowsingContextId,
    }

    fn fixture(enabled: bool, chooser: Option<Arc<dyn PortChooser>>) -> Fixture {
        fixture_on(enabled, chooser, None)
    }

    fn fixture_on(
        enabled: bool,
        chooser: Option<Arc<dyn PortChooser>>,
        runtime: Option<Handle>,
    ) -> Fixture {
        let frame = FrameId::new();
        let context = BrowsingContextId::new();
        let mut frames = HashMap::new();
        frames.insert(
            frame,
            (
                context,
                Origin::parse("https://device.example").unwrap(),
                Origin::parse("https://device.example").unwrap(),
            ),
        );

        let registry = Arc::new(PermissionStoreRegistry::new());
        registry.create_for_context(context, Arc::new(FixedPorts(vec![])));

        let mut builder = SerialDelegate::builder()
            .options(DelegateOptions::builder().chooser_enabled(enabled).build())
            .frame_host(Arc::new(StaticHost { frames }))
            .permission_stores(registry.clone());
        if let Some(chooser) = chooser {
            builder = builder.chooser(chooser);
        }
        if let Some(runtime) = runtime {
            builder = builder.runtime(runtime);
        }

        Fixture {
            delegate: builder.build().unwrap(),
            registry,
            frame,
            context,
        }
    }

    #[test]
    fn test_builder_requires_frame_host() {
        let err = SerialDelegate::builder()
            .permission_stores(Arc::new(PermissionStoreRegistry::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SerialError::MissingCollaborator("frame_host")));
    }

    #[test]
    fn test_builder_requires_stores() {
        let err = SerialDelegate::builder()
            .frame_host(Arc::new(StaticHost {
                frames: HashMap::new(),
            }))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SerialError::MissingCollaborator("permission_stores")
        ));
    }

    #[test]
    fn test_enabled_without_runtime_fails() {
        let err = SerialDelegate::builder()
            .options(DelegateOptions::builder().chooser_enabled(true).build())
            .frame_host(Arc::new(StaticHost {
                frames: HashMap::new(),
            }))
            .permission_stores(Arc::new(PermissionStoreRegistry::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SerialError::NoRuntime));
    }

    #[test]
    fn test_disabled_resolves_synchronously() {
        let fx = fixture(false, None);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let chooser = fx.delegate.request_port(fx.frame, vec![], move |port| {
            assert!(port.is_none());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(chooser.session_id().is_none());
        assert!(fx.delegate.lookup_session(&fx.frame).is_none());
        assert_eq!(fx.delegate.session_count(), 0);
    }

    #[tokio::test]
    async fn test_request_creates_session() {
        let fx = fixture(true, Some(Arc::new(NeverChooses)));
        let filters = vec![SerialPortFilter::vendor(0x0403)];

        let chooser = fx.delegate.request_port(fx.frame, filters.clone(), |_| {});
        let info = fx.delegate.lookup_session(&fx.frame).unwrap();
        assert_eq!(Some(info.id), chooser.session_id());
        assert_eq!(info.filters, filters);
        assert!(!info.completed);

        // Dropping the handle changes nothing
        drop(chooser);
        assert!(fx.delegate.lookup_session(&fx.frame).is_some());
    }

    #[tokio::test]
    async fn test_superseding_request_replaces_session() {
        let fx = fixture(true, Some(Arc::new(NeverChooses)));
        let (tx1, rx1) = oneshot::channel();

        let first = fx.delegate.request_port(fx.frame, vec![], move |port| {
            let _ = tx1.send(port);
        });
        let second = fx.delegate.request_port(fx.frame, vec![], |_| {});

        assert_eq!(fx.delegate.session_count(), 1);
        let info = fx.delegate.lookup_session(&fx.frame).unwrap();
        assert_eq!(Some(info.id), second.session_id());
        assert_ne!(first.session_id(), second.session_id());

        // The replaced session resolved empty
        assert_eq!(rx1.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_session_is_idempotent() {
        let fx = fixture(true, Some(Arc::new(NeverChooses)));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        fx.delegate.request_port(fx.frame, vec![], move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        fx.delegate.remove_session(&fx.frame);
        fx.delegate.remove_session(&fx.frame);
        assert!(fx.delegate.lookup_session(&fx.frame).is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Never had a session at all
        fx.delegate.remove_session(&FrameId::new());
    }

    #[tokio::test]
    async fn test_finish_session_ignores_stale_id() {
        let fx = fixture(true, Some(Arc::new(NeverChooses)));
        let first = fx.delegate.request_port(fx.frame, vec![], |_| {});
        let second = fx.delegate.request_port(fx.frame, vec![], |_| {});

        fx.delegate
            .finish_session(&fx.frame, first.session_id().unwrap());
        assert_eq!(
            fx.delegate.lookup_session(&fx.frame).map(|s| s.id),
            second.session_id()
        );

        fx.delegate
            .finish_session(&fx.frame, second.session_id().unwrap());
        assert!(fx.delegate.lookup_session(&fx.frame).is_none());
    }

    #[test]
    fn test_request_on_shut_down_runtime_finishes_session() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        drop(runtime);

        let fx = fixture_on(true, Some(Arc::new(NeverChooses)), Some(handle));
        let (tx, mut rx) = oneshot::channel();
        let chooser = fx.delegate.request_port(fx.frame, vec![], move |port| {
            let _ = tx.send(port);
        });

        assert!(chooser.session_id().is_some());
        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(fx.delegate.lookup_session(&fx.frame).is_none());
        assert_eq!(fx.delegate.session_count(), 0);
    }

    #[test]
    fn test_permission_queries_forward_to_store() {
        let fx = fixture(false, None);
        let port = SerialPortInfo::new("/dev/ttyUSB0");

        assert!(!fx.delegate.has_port_permission(&fx.frame, &port));
        fx.delegate.grant_port_permission(&fx.frame, &port).unwrap();
        assert!(fx.delegate.has_port_permission(&fx.frame, &port));
        assert_eq!(fx.delegate.granted_ports(&fx.frame).unwrap(), vec![port.clone()]);

        assert!(fx.delegate.revoke_port_permission(&fx.frame, &port).unwrap());
        assert!(!fx.delegate.has_port_permission(&fx.frame, &port));
    }

    #[test]
    fn test_unknown_frame() {
        let fx = fixture(false, None);
        let stranger = FrameId::new();
        let port = SerialPortInfo::new("/dev/ttyUSB0");

        assert!(!fx.delegate.can_request_port_permission(&stranger));
        assert!(!fx.delegate.has_port_permission(&stranger, &port));
        assert!(matches!(
            fx.delegate.port_manager(&stranger),
            Err(SerialError::UnknownFrame(f)) if f == stranger
        ));
        assert!(fx.delegate.grant_port_permission(&stranger, &port).is_err());
    }

    #[test]
    fn test_store_gone() {
        let fx = fixture(false, None);
        fx.registry.shutdown_context(&fx.context);

        let observer: Arc<dyn PortObserver> = Arc::new(Quiet);
        assert!(matches!(
            fx.delegate.port_manager(&fx.frame),
            Err(SerialError::StoreUnavailable { context }) if context == fx.context
        ));
        assert!(fx.delegate.add_port_observer(&fx.frame, observer.clone()).is_err());
        fx.delegate.remove_port_observer(&fx.frame, &observer);
        assert!(!fx
            .delegate
            .has_port_permission(&fx.frame, &SerialPortInfo::new("/dev/ttyS0")));
    }

    struct Quiet;

    impl PortObserver for Quiet {}

    #[test]
    fn test_default_policy_allows() {
        let fx = fixture(false, None);
        assert!(fx.delegate.can_request_port_permission(&fx.frame));
    }

    #[test]
    fn test_handle_does_not_keep_delegate_alive() {
        let fx = fixture(false, None);
        let handle = fx.delegate.handle();
        assert!(handle.is_alive());
        assert!(handle.upgrade().is_some());

        drop(fx);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
    }
}
