//! Port chooser sessions
//!
//! A chooser session backs one "let the user pick a serial port" interaction
//! for one frame. The [`SerialDelegate`](crate::delegate::SerialDelegate)
//! owns every live session; this module defines the pieces around it:
//!
//! - [`ChooserSession`] - Per-frame session state and its completion contract
//! - [`PortChooser`] - Trait for the host's picker UI
//! - [`ChooserRequest`] - What the picker is asked to show
//! - [`SerialChooser`] - Handle returned to the requester
//!
//! # Session flow
//!
//! ```text
//! request_port() ──→ SessionTask::spawn() ────────────→ session task
//!                                                        │
//!                     PortManager::get_devices() ←───────┤
//!                     filter by SerialPortFilter         │
//!                     PortChooser::select_port() ←───────┤
//!                     grant permission via delegate      │
//!                     ChooserCallback(Some/None) ←───────┤
//!                     delegate.finish_session(id) ←──────┘
//! ```
//!
//! # Completion contract
//!
//! The callback passed to `request_port` fires exactly once. If the session
//! is destroyed first (replaced by a newer request, removed, its frame torn
//! down, or the delegate dropped) the session's destructor fires it with
//! `None`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::frame::{FrameId, Origin};
use crate::port::{PortToken, SerialPortFilter, SerialPortInfo};

mod session;

pub use session::ChooserSession;

/// Single-use continuation receiving the selected port, or `None`
pub type ChooserCallback = Box<dyn FnOnce(Option<SerialPortInfo>) + Send + 'static>;

/// Identity of one chooser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What the picker UI is asked to present
///
/// Serializable so hosts can forward it to a UI process as an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooserRequest {
    /// Session this request belongs to
    pub session: SessionId,
    /// Frame that asked for a port
    pub frame: FrameId,
    /// Committed origin of that frame, for the prompt text
    pub origin: Origin,
    /// Ports that passed the page's filters
    pub ports: Vec<SerialPortInfo>,
}

/// The host's port picker UI
///
/// Return the token of the port the user picked, or `None` if they
/// cancelled. Returning a token that is not in `request.ports` is treated as
/// a cancellation.
///
/// # Example
///
/// ```
/// use serial_delegate::chooser::{ChooserRequest, PortChooser};
/// use serial_delegate::port::PortToken;
/// use async_trait::async_trait;
///
/// /// Picks the first port offered, for kiosk setups with one device
/// struct FirstPort;
///
/// #[async_trait]
/// impl PortChooser for FirstPort {
///     async fn select_port(&self, request: ChooserRequest) -> Option<PortToken> {
///         request.ports.first().map(|port| port.token)
///     }
/// }
/// ```
#[async_trait]
pub trait PortChooser: Send + Sync {
    /// Ask the user to pick one of `request.ports`
    async fn select_port(&self, request: ChooserRequest) -> Option<PortToken>;
}

/// Snapshot of a live session, returned by
/// [`SerialDelegate::lookup_session`](crate::delegate::SerialDelegate::lookup_session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session identity
    pub id: SessionId,
    /// Frame the session is bound to
    pub frame: FrameId,
    /// Filters the page supplied
    pub filters: Vec<SerialPortFilter>,
    /// Whether the callback has already fired
    pub completed: bool,
}

/// Handle returned from a port request
///
/// Dropping it does nothing: the session's lifetime is driven by the
/// delegate, not by this handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialChooser {
    frame: FrameId,
    session: Option<SessionId>,
}

impl SerialChooser {
    pub(crate) fn attached(frame: FrameId, session: SessionId) -> Self {
        Self {
            frame,
            session: Some(session),
        }
    }

    pub(crate) fn detached(frame: FrameId) -> Self {
        Self {
            frame,
            session: None,
        }
    }

    /// Frame the request was made for
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Session created for the request; `None` when the chooser is disabled
    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }
}
