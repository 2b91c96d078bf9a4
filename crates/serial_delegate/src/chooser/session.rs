//! Chooser session state and the task that drives it.

use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::chooser::{ChooserCallback, ChooserRequest, PortChooser, SessionId, SessionInfo};
use crate::delegate::DelegateHandle;
use crate::frame::FrameId;
use crate::lock_unpoisoned;
use crate::port::{SerialPortFilter, SerialPortInfo};

/// Holds the callback until whoever finishes first takes it
struct CompletionSlot {
    callback: Mutex<Option<ChooserCallback>>,
}

impl CompletionSlot {
    fn new(callback: ChooserCallback) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
        }
    }

    /// Fire the callback if nobody has yet. Returns `true` if this call fired it.
    fn complete(&self, result: Option<SerialPortInfo>) -> bool {
        // Take under the lock, call outside it
        let callback = lock_unpoisoned(&self.callback).take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }

    fn is_completed(&self) -> bool {
        lock_unpoisoned(&self.callback).is_none()
    }
}

/// State for one in-flight port selection, bound to one frame
///
/// The delegate owns the session; the session holds only a weak
/// [`DelegateHandle`] back to it and checks it before every use.
///
/// Dropping a session aborts its task and, if the callback has not fired
/// yet, fires it with `None`.
pub struct ChooserSession {
    id: SessionId,
    frame: FrameId,
    filters: Arc<[SerialPortFilter]>,
    completion: Arc<CompletionSlot>,
    delegate: DelegateHandle,
    task: Option<JoinHandle<()>>,
}

impl ChooserSession {
    pub(crate) fn new(
        frame: FrameId,
        filters: Vec<SerialPortFilter>,
        callback: ChooserCallback,
        delegate: DelegateHandle,
    ) -> Self {
        Self {
            id: SessionId::new(),
            frame,
            filters: filters.into(),
            completion: Arc::new(CompletionSlot::new(callback)),
            delegate,
            task: None,
        }
    }

    /// Build the enumeration/selection task for this session
    ///
    /// The task shares the completion slot, so whichever of the task and
    /// the session finishes first fires the callback.
    pub(crate) fn task(&self, chooser: Option<Arc<dyn PortChooser>>) -> SessionTask {
        SessionTask {
            id: self.id,
            frame: self.frame,
            filters: Arc::clone(&self.filters),
            completion: Arc::clone(&self.completion),
            delegate: self.delegate.clone(),
            chooser,
        }
    }

    /// Keep `task` so dropping the session aborts it
    pub(crate) fn attach_task(&mut self, task: JoinHandle<()>) {
        if let Some(previous) = self.task.replace(task) {
            previous.abort();
        }
    }

    /// Session identity
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Frame this session is bound to
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Filters supplied by the page, unmodified
    pub fn filters(&self) -> &[SerialPortFilter] {
        &self.filters
    }

    /// Whether the completion callback has fired
    pub fn is_completed(&self) -> bool {
        self.completion.is_completed()
    }

    pub(crate) fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            frame: self.frame,
            filters: self.filters.to_vec(),
            completed: self.is_completed(),
        }
    }
}

impl Drop for ChooserSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.completion.complete(None) {
            debug!(
                "Chooser session {} for {} destroyed before completion",
                self.id, self.frame
            );
        }
    }
}

/// Everything the spawned task needs, detached from the session's storage
///
/// Dropping it, whether after `run` returns, on abort, or unpolled because
/// the runtime is gone, resolves the callback with `None` if it is still
/// pending and asks the delegate to finish this session.
pub(crate) struct SessionTask {
    id: SessionId,
    frame: FrameId,
    filters: Arc<[SerialPortFilter]>,
    completion: Arc<CompletionSlot>,
    delegate: DelegateHandle,
    chooser: Option<Arc<dyn PortChooser>>,
}

impl SessionTask {
    /// Spawn the task on `runtime`
    ///
    /// Call without the delegate's session lock held. When the runtime has
    /// already shut down the task is dropped inside this call, and its guard
    /// fires the callback and finishes the session before it returns.
    pub(crate) fn spawn(self, runtime: &Handle) -> JoinHandle<()> {
        trace!("Starting chooser session {} for {}", self.id, self.frame);
        runtime.spawn(self.run())
    }

    async fn run(self) {
        let result = self.select().await;
        self.completion.complete(result);
    }

    async fn select(&self) -> Option<SerialPortInfo> {
        let Some(chooser) = self.chooser.as_ref() else {
            debug!("No port chooser registered, session {} resolves empty", self.id);
            return None;
        };

        // Scope the strong reference so it is gone before the first await
        let (port_manager, origin) = {
            let Some(delegate) = self.delegate.upgrade() else {
                debug!("Delegate gone before session {} started", self.id);
                return None;
            };
            let port_manager = match delegate.port_manager(&self.frame) {
                Ok(port_manager) => port_manager,
                Err(e) => {
                    warn!("Session {} cannot reach port manager: {}", self.id, e);
                    return None;
                }
            };
            (port_manager, delegate.committed_origin(&self.frame)?)
        };

        let ports: Vec<SerialPortInfo> = match port_manager.get_devices().await {
            Ok(ports) => ports
                .into_iter()
                .filter(|port| SerialPortFilter::matches_any(&self.filters, port))
                .collect(),
            Err(e) => {
                warn!("Session {} port enumeration failed: {}", self.id, e);
                return None;
            }
        };
        drop(port_manager);

        let request = ChooserRequest {
            session: self.id,
            frame: self.frame,
            origin,
            ports: ports.clone(),
        };
        let token = chooser.select_port(request).await?;

        let Some(port) = ports.into_iter().find(|port| port.token == token) else {
            warn!("Session {} chooser returned unknown port {}", self.id, token);
            return None;
        };

        let Some(delegate) = self.delegate.upgrade() else {
            debug!("Delegate gone before session {} could grant", self.id);
            return None;
        };
        match delegate.grant_port_permission(&self.frame, &port) {
            Ok(()) => Some(port),
            Err(e) => {
                warn!("Session {} could not record grant: {}", self.id, e);
                None
            }
        }
    }
}

impl Drop for SessionTask {
    fn drop(&mut self) {
        if self.completion.complete(None) {
            debug!("Chooser session {} task ended without a result", self.id);
        }
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.finish_session(&self.frame, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    struct PickFirst;

    #[async_trait]
    impl PortChooser for PickFirst {
        async fn select_port(&self, request: ChooserRequest) -> Option<PortToken> {
            request.ports.first().map(|port| port.token)
        }
    }

    fn counting_callback(count: &Arc<AtomicUsize>) -> ChooserCallback {
        let count = Arc::clone(count);
        Box::new(move |_port| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_completion_slot_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = CompletionSlot::new(counting_callback(&count));

        assert!(!slot.is_completed());
        assert!(slot.complete(None));
        assert!(slot.is_completed());
        assert!(!slot.complete(Some(SerialPortInfo::new("/dev/ttyS0"))));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_without_start_fires_none() {
        let (tx, mut rx) = oneshot::channel();
        let session = ChooserSession::new(
            FrameId::new(),
            vec![SerialPortFilter::vendor(1)],
            Box::new(move |port| {
                let _ = tx.send(port);
            }),
            DelegateHandle::detached(),
        );
        assert_eq!(session.filters(), &[SerialPortFilter::vendor(1)]);
        assert!(!session.is_completed());

        drop(session);
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn test_info_snapshot() {
        let frame = FrameId::new();
        let count = Arc::new(AtomicUsize::new(0));
        let session = ChooserSession::new(
            frame,
            vec![],
            counting_callback(&count),
            DelegateHandle::detached(),
        );

        let info = session.info();
        assert_eq!(info.id, session.id());
        assert_eq!(info.frame, frame);
        assert!(info.filters.is_empty());
        assert!(!info.completed);
    }

    #[tokio::test]
    async fn test_no_chooser_resolves_none() {
        let (tx, rx) = oneshot::channel();
        let mut session = ChooserSession::new(
            FrameId::new(),
            vec![],
            Box::new(move |port| {
                let _ = tx.send(port);
            }),
            DelegateHandle::detached(),
        );
        let task = session.task(None).spawn(&Handle::current());
        session.attach_task(task);

        assert_eq!(rx.await.unwrap(), None);
        assert!(session.is_completed());
    }

    #[tokio::test]
    async fn test_dead_delegate_resolves_none() {
        let (tx, rx) = oneshot::channel();
        let mut session = ChooserSession::new(
            FrameId::new(),
            vec![],
            Box::new(move |port| {
                let _ = tx.send(port);
            }),
            DelegateHandle::detached(),
        );
        let task = session
            .task(Some(Arc::new(PickFirst)))
            .spawn(&Handle::current());
        session.attach_task(task);

        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_after_completion_does_not_refire() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let count_clone = Arc::clone(&count);
        let mut session = ChooserSession::new(
            FrameId::new(),
            vec![],
            Box::new(move |port| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(port);
            }),
            DelegateHandle::detached(),
        );
        let task = session.task(None).spawn(&Handle::current());
        session.attach_task(task);
        rx.await.unwrap();

        drop(session);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_on_shut_down_runtime_resolves_none() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        drop(runtime);

        let (tx, mut rx) = oneshot::channel();
        let mut session = ChooserSession::new(
            FrameId::new(),
            vec![],
            Box::new(move |port| {
                let _ = tx.send(port);
            }),
            DelegateHandle::detached(),
        );
        let task = session.task(Some(Arc::new(PickFirst))).spawn(&handle);

        assert!(session.is_completed());
        assert_eq!(rx.try_recv().unwrap(), None);
        session.attach_task(task);
    }
}
