//! Host collaborator traits
//!
//! The delegate does not know anything about the host's frame tree. It asks
//! these traits instead:
//!
//! - [`FrameHost`] - Resolve a frame to its browsing context and committed origins
//! - [`SerialAccessPolicy`] - Coarse "may this origin use serial at all" check
//!
//! Both are synchronous: every delegate operation completes without yielding.
//!
//! # Example
//!
//! ```
//! use serial_delegate::frame::Origin;
//! use serial_delegate::host::SerialAccessPolicy;
//!
//! // Any `Fn(&Origin) -> bool` is a policy
//! let https_only = |origin: &Origin| origin.scheme() == "https";
//!
//! let secure = Origin::parse("https://example.com").unwrap();
//! let insecure = Origin::parse("http://example.com").unwrap();
//! assert!(https_only.can_request_serial_access(&secure));
//! assert!(!https_only.can_request_serial_access(&insecure));
//! ```

use crate::frame::{BrowsingContextId, FrameId, Origin, OriginPair};

/// The host's view of its frame tree
///
/// All lookups return `None` once the frame has been destroyed.
pub trait FrameHost: Send + Sync {
    /// Browsing context that owns `frame`
    fn browsing_context(&self, frame: &FrameId) -> Option<BrowsingContextId>;

    /// Origin of the document currently committed in `frame`
    fn committed_origin(&self, frame: &FrameId) -> Option<Origin>;

    /// Origin committed in the top-level frame of `frame`'s tree
    fn top_frame_origin(&self, frame: &FrameId) -> Option<Origin>;

    /// Resolve the (requesting, embedding) pair for `frame`
    ///
    /// Computed fresh on every call; navigations change the answer.
    fn origin_pair(&self, frame: &FrameId) -> Option<OriginPair> {
        let requesting = self.committed_origin(frame)?;
        let embedding = self.top_frame_origin(frame)?;
        Some(OriginPair::new(requesting, embedding))
    }
}

/// Coarse permission check made before any device-specific grant
pub trait SerialAccessPolicy: Send + Sync {
    /// Whether `origin` may initiate a serial port request at all
    fn can_request_serial_access(&self, origin: &Origin) -> bool;
}

/// Blanket implementation so closures can be used as policies
impl<F> SerialAccessPolicy for F
where
    F: Fn(&Origin) -> bool + Send + Sync,
{
    fn can_request_serial_access(&self, origin: &Origin) -> bool {
        self(origin)
    }
}
