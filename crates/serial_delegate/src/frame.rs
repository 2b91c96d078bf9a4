//! Frame, browsing context, and origin identities
//!
//! The delegate never interprets a [`FrameId`] or [`BrowsingContextId`]; they
//! are opaque keys handed out by the host. An [`Origin`] is the normalized
//! `scheme://host[:port]` triple used for authorization, and an
//! [`OriginPair`] is the two-part key every grant is stored under.
//!
//! # Example
//!
//! ```
//! use serial_delegate::frame::{Origin, OriginPair};
//!
//! let requesting = Origin::parse("https://Widgets.Example:443/app?x=1").unwrap();
//! assert_eq!(requesting.to_string(), "https://widgets.example");
//!
//! let embedding = Origin::parse("https://portal.example").unwrap();
//! let pair = OriginPair::new(requesting, embedding);
//! assert!(!pair.is_same_origin());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

use crate::error::SerialError;

/// Opaque handle identifying a single frame in the host's frame tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(Uuid);

impl FrameId {
    /// Allocate a fresh, random frame identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FrameId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// Opaque handle identifying a browsing context (a profile-scoped content session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrowsingContextId(Uuid);

impl BrowsingContextId {
    /// Allocate a fresh, random browsing context identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BrowsingContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BrowsingContextId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for BrowsingContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

/// A web origin: scheme, host and an optional non-default port
///
/// Parsing follows the WHATWG URL rules: scheme and host are normalized
/// (lowercase, IDNA to punycode, percent-decoded), userinfo, path, query and
/// fragment are dropped, and the port is dropped when it is the scheme's
/// default. Inputs whose origin is opaque (`file:`, `data:`, custom schemes)
/// are rejected since they cannot hold a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse and normalize an origin from a URL string
    pub fn parse(input: &str) -> Result<Self, SerialError> {
        let invalid = |reason: String| SerialError::InvalidOrigin {
            input: input.to_string(),
            reason,
        };

        let url = Url::parse(input).map_err(|e| invalid(e.to_string()))?;
        match url.origin() {
            url::Origin::Tuple(scheme, host, port) => {
                let port = Some(port).filter(|p| Some(*p) != default_port(&scheme));
                Ok(Self {
                    host: host.to_string(),
                    scheme,
                    port,
                })
            }
            url::Origin::Opaque(_) => Err(invalid(format!(
                "scheme `{}` has an opaque origin",
                url.scheme()
            ))),
        }
    }

    /// Scheme, lowercased (e.g. `"https"`)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host in its serialized ASCII form (IPv6 literals keep their brackets)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, `None` when it is the scheme default
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

impl FromStr for Origin {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Origin {
    type Error = SerialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}

/// The (requesting, embedding) key that device grants are stored under
///
/// `requesting` is the committed origin of the frame making the request;
/// `embedding` is the committed origin of its top-level frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginPair {
    /// Origin of the requesting frame
    pub requesting: Origin,
    /// Origin of the top-level frame embedding it
    pub embedding: Origin,
}

impl OriginPair {
    /// Build a pair from its two halves
    pub fn new(requesting: Origin, embedding: Origin) -> Self {
        Self {
            requesting,
            embedding,
        }
    }

    /// True when the request comes from the top-level origin itself
    pub fn is_same_origin(&self) -> bool {
        self.requesting == self.embedding
    }
}

impl fmt::Display for OriginPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} embedded in {}", self.requesting, self.embedding)
    }
}
