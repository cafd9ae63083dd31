#![forbid(unsafe_code)]

//! Virtual tree: loose view descriptions, normalized virtual nodes, the host
//! [`Dom`] abstraction and the [`Reconciler`] that patches a host to match a
//! new tree.

pub mod builder;
pub mod dom;
pub mod error;
pub mod memory;
pub mod reconcile;
pub mod vnode;

pub use builder::{Description, ElementBuilder, build, h};
pub use dom::Dom;
pub use error::BuildError;
pub use memory::{MemoryDom, NodeId};
pub use reconcile::{PatchStats, Reconciler};
pub use vnode::{Data, DomEvent, Element, Listener, Selector, VNode};
