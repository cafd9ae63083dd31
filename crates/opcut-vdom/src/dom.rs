#![forbid(unsafe_code)]

//! Host document abstraction.
//!
//! The reconciler only talks to the host through [`Dom`]. A browser binding
//! implements it over real DOM nodes; [`MemoryDom`](crate::MemoryDom) is the
//! in-process implementation used by tests and headless hosts.

use std::fmt;
use std::hash::Hash;

use opcut_core::Value;

/// Mutable host document.
///
/// Node handles are small copyable identifiers. Operations on a handle that
/// no longer refers to a live node are ignored.
pub trait Dom {
    type Node: Copy + Eq + Hash + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn set_text(&mut self, node: Self::Node, text: &str);

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. A child that is already attached is moved.
    fn insert_before(&mut self, parent: Self::Node, child: Self::Node, reference: Option<Self::Node>);
    /// Detach `child` from `parent` and drop its subtree.
    fn remove_child(&mut self, parent: Self::Node, child: Self::Node);
    fn first_child(&self, node: Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: Self::Node, name: &str);

    fn set_property(&mut self, node: Self::Node, name: &str, value: &Value);
    fn remove_property(&mut self, node: Self::Node, name: &str);
    /// Live property value, which user input may have changed.
    fn property(&self, node: Self::Node, name: &str) -> Option<Value>;

    fn set_class(&mut self, node: Self::Node, class: &str, enabled: bool);

    /// Start delivering `event` on `node` to the renderer.
    fn add_listener(&mut self, node: Self::Node, event: &str);
    fn remove_listener(&mut self, node: Self::Node, event: &str);
}
