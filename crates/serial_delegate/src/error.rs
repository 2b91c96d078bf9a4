//! Error types for the serial delegate
//!
//! This module defines the error hierarchy for the serial_delegate crate using `thiserror`.
//! Operations that can fail return `Result<T, SerialError>`.
//!
//! Several conditions are deliberately *not* errors and never show up here:
//! a disabled chooser (requests resolve to "no port selected"), looking up or
//! removing a session for a frame that has none, and removing a port observer
//! after the browsing context has gone away.
//!
//! # Error Variants
//!
//! - [`SerialError::StoreUnavailable`]: No permission store for the frame's browsing context
//! - [`SerialError::UnknownFrame`]: The host could not resolve a frame
//! - [`SerialError::InvalidOrigin`]: An origin string could not be parsed
//! - [`SerialError::MissingCollaborator`]: The delegate builder was missing a required piece
//! - [`SerialError::NoRuntime`]: The chooser is enabled but no tokio runtime is available
//! - [`SerialError::Enumeration`]: Returned by `PortManager` implementations that fail to list ports
//! - [`SerialError::ConfigParse`]: Options JSON could not be decoded (auto-converts from `serde_json::Error`)
//!
//! # Example
//!
//! ```rust
//! use serial_delegate::error::SerialError;
//! use serial_delegate::frame::Origin;
//!
//! fn example() -> Result<Origin, SerialError> {
//!     // Invalid origins surface as `SerialError::InvalidOrigin`
//!     Origin::parse("not an origin")
//! }
//!
//! assert!(example().is_err());
//! ```

use thiserror::Error;

use crate::frame::{BrowsingContextId, FrameId};

/// The main error type for all serial_delegate operations
#[derive(Error, Debug)]
pub enum SerialError {
    /// No permission store is reachable for the browsing context
    ///
    /// This happens when the browsing context was never registered or is being
    /// torn down while a call is in flight.
    #[error("No serial permission store for browsing context {context}")]
    StoreUnavailable {
        /// The browsing context that had no store
        context: BrowsingContextId,
    },

    /// The host could not resolve the frame
    ///
    /// The frame was already destroyed, or it never belonged to this host.
    #[error("Unknown frame {0}")]
    UnknownFrame(FrameId),

    /// Failed to parse an origin
    #[error("Invalid origin '{input}': {reason}")]
    InvalidOrigin {
        /// The rejected input
        input: String,
        /// Description of what was wrong with it
        reason: String,
    },

    /// A required collaborator was not supplied to the delegate builder
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// The chooser is enabled but no tokio runtime handle could be obtained
    ///
    /// # Resolution
    /// - Build the delegate from inside a tokio runtime
    /// - Or pass a handle explicitly with `SerialDelegateBuilder::runtime`
    #[error("Serial chooser is enabled but no tokio runtime is available")]
    NoRuntime,

    /// The port manager failed to enumerate ports
    ///
    /// The crate never builds this itself. It is the error
    /// [`PortManager`](crate::port::PortManager) implementations return from
    /// `get_devices`; a chooser session that sees it resolves with no port.
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    /// Failed to parse options JSON
    ///
    /// This error is automatically converted from `serde_json::Error`.
    #[error("Failed to parse delegate options: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
