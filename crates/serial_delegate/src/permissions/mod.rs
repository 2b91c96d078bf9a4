//! Serial port permission storage.
//!
//! Grants are recorded per browsing context in a [`SerialPermissionStore`],
//! keyed by the (requesting origin, embedding origin) pair. Stores are looked
//! up through a [`PermissionStoreProvider`]; [`PermissionStoreRegistry`] is the
//! in-memory implementation hosts normally use.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ PermissionStoreRegistry  │  BrowsingContextId → Arc<SerialPermissionStore>
//! └────────────┬─────────────┘
//!              │
//!              ↓
//! ┌──────────────────────────┐
//! │  SerialPermissionStore   │
//! │  - ephemeral grants      │  OriginPair → {PortToken}
//! │  - persistent grants     │  OriginPair → {PersistentPortId}
//! │  - PortManager handle    │
//! │  - PortObserver list     │
//! └──────────────────────────┘
//! ```
//!
//! The store is owned by the browsing context, not by the delegate or any
//! chooser session. Neither holds a store across an `.await`.

mod registry;
mod store;

pub use registry::{PermissionStoreProvider, PermissionStoreRegistry};
pub use store::{PortObserver, SerialPermissionStore};
