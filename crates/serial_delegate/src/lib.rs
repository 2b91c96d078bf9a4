//! Serial Delegate - per-frame serial port chooser and permission broker
//!
//! This crate mediates access from web content to physical serial ports inside
//! a multi-process browser host. Device access is always user-mediated and
//! scoped to the (requesting origin, top-level origin) pair.
//!
//! # Overview
//!
//! - One [`SerialDelegate`](delegate::SerialDelegate) per host coordinates everything
//! - Each frame has at most one in-flight [`ChooserSession`](chooser::ChooserSession)
//! - Grants live in a [`SerialPermissionStore`](permissions::SerialPermissionStore)
//!   owned by the frame's browsing context
//! - The chooser sits behind a capability gate that is off by default
//!
//! # Architecture
//!
//! The crate is organized into these modules:
//! - `delegate`: The coordinator and its builder
//! - `chooser`: Chooser sessions, the picker UI trait, and the requester handle
//! - `permissions`: Per-context permission stores and their registry
//! - `host`: Traits the host implements to describe its frame tree and policy
//! - `port`: Port descriptors, filters, and the port manager trait
//! - `frame`: Frame, browsing context and origin identities
//! - `options`: Configuration and the capability gate
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_delegate::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     frame_host: Arc<dyn FrameHost>,
//! #     port_manager: Arc<dyn PortManager>,
//! #     picker: Arc<dyn PortChooser>,
//! #     context: BrowsingContextId,
//! #     frame: FrameId,
//! # ) -> Result<(), SerialError> {
//! let stores = Arc::new(PermissionStoreRegistry::new());
//! stores.create_for_context(context, port_manager);
//!
//! let delegate = SerialDelegate::builder()
//!     .options(DelegateOptions::from_feature_list("SerialChooser"))
//!     .frame_host(frame_host)
//!     .permission_stores(stores)
//!     .chooser(picker)
//!     .build()?;
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! delegate.request_port(frame, vec![], move |port| {
//!     let _ = tx.send(port);
//! });
//!
//! if let Ok(Some(port)) = rx.await {
//!     assert!(delegate.has_port_permission(&frame, &port));
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-frame chooser sessions
///
/// A session backs one "pick a serial port" interaction. It owns the page's
/// filters and the requester's callback, and guarantees the callback fires
/// exactly once on every exit path.
pub mod chooser;

/// The serial delegate
///
/// `SerialDelegate` owns the frame → session map and forwards permission
/// queries to the store of the frame's browsing context.
pub mod delegate;

/// Error types
///
/// This module defines the `SerialError` enum:
///
/// - `StoreUnavailable` - No permission store for the browsing context
/// - `UnknownFrame` - The host could not resolve a frame
/// - `InvalidOrigin` - Origin parsing failed
/// - `MissingCollaborator` - Builder was missing a required piece
/// - `NoRuntime` - Chooser enabled without a tokio runtime
/// - `Enumeration` - Port enumeration failed
/// - `ConfigParse` - Options JSON was malformed (auto-converts from `serde_json::Error`)
pub mod error;

/// Frame, browsing context, and origin identities
pub mod frame;

/// Host collaborator traits
pub mod host;

/// Configuration options and the chooser capability gate
pub mod options;

/// Serial permission stores
///
/// Key types:
/// - `SerialPermissionStore` - Grants for one browsing context
/// - `PermissionStoreRegistry` - Maps browsing contexts to stores
/// - `PortObserver` - Port and permission change notifications
pub mod permissions;

/// Serial port descriptors and filters
pub mod port;

/// Lock a mutex, recovering the data if a previous holder panicked
///
/// No critical section in this crate leaves its data half-updated.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Prelude module for common imports
pub mod prelude {
    //! Common imports for serial_delegate users
    //!
    //! Use `use serial_delegate::prelude::*;` to import commonly used types.

    pub use crate::chooser::{
        ChooserCallback, ChooserRequest, PortChooser, SerialChooser, SessionId, SessionInfo,
    };
    pub use crate::delegate::{DelegateHandle, SerialDelegate, SerialDelegateBuilder};
    pub use crate::error::SerialError;
    pub use crate::frame::{BrowsingContextId, FrameId, Origin, OriginPair};
    pub use crate::host::{FrameHost, SerialAccessPolicy};
    pub use crate::options::DelegateOptions;
    pub use crate::permissions::{
        PermissionStoreProvider, PermissionStoreRegistry, PortObserver, SerialPermissionStore,
    };
    pub use crate::port::{PortManager, PortToken, SerialPortFilter, SerialPortInfo};
}
