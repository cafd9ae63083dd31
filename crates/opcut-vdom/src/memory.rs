#![forbid(unsafe_code)]

//! Arena-backed in-memory [`Dom`].
//!
//! Freed slots are reused, but every reuse bumps the slot's generation, so an
//! id held across renders never aliases a newer node. A test can keep an id
//! and check whether the reconciler kept the node alive.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use opcut_core::Value;

use crate::dom::Dom;

/// Handle of a [`MemoryDom`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
enum Kind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        props: BTreeMap<String, Value>,
        classes: BTreeSet<String>,
        listeners: BTreeSet<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: Kind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// In-memory document with a `body` root.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    body: NodeId,
    created: usize,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    #[must_use]
    pub fn new() -> Self {
        let mut dom = Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            created: 0,
        };
        dom.body = dom.alloc(element_kind("body"));
        dom.created = 0;
        dom
    }

    /// The document root, used as the default mount point.
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes created since construction (the body excluded).
    #[must_use]
    pub const fn created_count(&self) -> usize {
        self.created
    }

    /// Whether `node` is still part of the arena.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    /// Number of nodes currently alive (the body excluded).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.node.is_some())
            .count()
            .saturating_sub(1)
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            Kind::Element { tag, .. } => Some(tag),
            Kind::Text(_) => None,
        }
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            Kind::Text(text) => Some(text),
            Kind::Element { .. } => None,
        }
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.node(node)?.kind {
            Kind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            Kind::Text(_) => None,
        }
    }

    /// Classes currently set, sorted.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        match self.node(node).map(|n| &n.kind) {
            Some(Kind::Element { classes, .. }) => classes.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Event names with a registered listener, sorted.
    #[must_use]
    pub fn listeners(&self, node: NodeId) -> Vec<String> {
        match self.node(node).map(|n| &n.kind) {
            Some(Kind::Element { listeners, .. }) => listeners.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[][..], |n| n.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Serialized children of `node`.
    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialized `node` including its own tag.
    #[must_use]
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            Kind::Text(text) => escape_into(text, out),
            Kind::Element {
                tag,
                attrs,
                classes,
                ..
            } => {
                let _ = write!(out, "<{tag}");
                if !classes.is_empty() {
                    let joined: Vec<&str> = classes.iter().map(String::as_str).collect();
                    let _ = write!(out, " class=\"{}\"", joined.join(" "));
                }
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                for &child in &node.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn alloc(&mut self, kind: Kind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        self.created += 1;
        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)?
            .node
            .as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)?
            .node
            .as_mut()
    }

    fn element_mut(&mut self, id: NodeId) -> Option<ElementMut<'_>> {
        match &mut self.node_mut(id)?.kind {
            Kind::Element {
                attrs,
                props,
                classes,
                listeners,
                ..
            } => Some(ElementMut {
                attrs,
                props,
                classes,
                listeners,
            }),
            Kind::Text(_) => None,
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    fn free(&mut self, id: NodeId) {
        let Some(node) = self
            .slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.take())
        else {
            return;
        };
        self.vacant.push(id.index);
        for child in node.children {
            self.free(child);
        }
    }
}

struct ElementMut<'a> {
    attrs: &'a mut BTreeMap<String, String>,
    props: &'a mut BTreeMap<String, Value>,
    classes: &'a mut BTreeSet<String>,
    listeners: &'a mut BTreeSet<String>,
}

fn element_kind(tag: &str) -> Kind {
    Kind::Element {
        tag: tag.to_owned(),
        attrs: BTreeMap::new(),
        props: BTreeMap::new(),
        classes: BTreeSet::new(),
        listeners: BTreeSet::new(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(element_kind(tag))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(Kind::Text(text.to_owned()))
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(Node {
            kind: Kind::Text(current),
            ..
        }) = self.node_mut(node)
        {
            text.clone_into(current);
        }
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let at = reference
            .and_then(|r| p.children.iter().position(|&c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(at, child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.detach(child);
        self.free(child);
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let at = siblings.iter().position(|&c| c == node)?;
        siblings.get(at + 1).copied()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.remove(name);
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Value) {
        if let Some(el) = self.element_mut(node) {
            el.props.insert(name.to_owned(), value.clone());
        }
    }

    fn remove_property(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.props.remove(name);
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        match &self.node(node)?.kind {
            Kind::Element { props, .. } => props.get(name).cloned(),
            Kind::Text(_) => None,
        }
    }

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool) {
        if let Some(el) = self.element_mut(node) {
            if enabled {
                el.classes.insert(class.to_owned());
            } else {
                el.classes.remove(class);
            }
        }
    }

    fn add_listener(&mut self, node: NodeId, event: &str) {
        if let Some(el) = self.element_mut(node) {
            el.listeners.insert(event.to_owned());
        }
    }

    fn remove_listener(&mut self, node: NodeId, event: &str) {
        if let Some(el) = self.element_mut(node) {
            el.listeners.remove(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_and_serialize() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let div = dom.create_element("div");
        let text = dom.create_text("a < b");
        dom.insert_before(div, text, None);
        dom.insert_before(body, div, None);
        dom.set_attribute(div, "id", "x");
        dom.set_class(div, "foo", true);
        assert_eq!(dom.inner_html(body), "<div class=\"foo\" id=\"x\">a &lt; b</div>");
        assert_eq!(dom.created_count(), 2);
    }

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let a = dom.create_text("a");
        let b = dom.create_text("b");
        dom.insert_before(body, a, None);
        dom.insert_before(body, b, None);
        dom.insert_before(body, b, Some(a));
        assert_eq!(dom.children(body), &[b, a]);
        assert_eq!(dom.next_sibling(b), Some(a));
        assert_eq!(dom.next_sibling(a), None);
    }

    #[test]
    fn remove_child_frees_subtree() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let ul = dom.create_element("ul");
        let li = dom.create_element("li");
        dom.insert_before(ul, li, None);
        dom.insert_before(body, ul, None);
        dom.remove_child(body, ul);
        assert!(!dom.contains(ul));
        assert!(!dom.contains(li));
        assert!(dom.children(body).is_empty());
        dom.set_attribute(li, "x", "y");
    }

    #[test]
    fn freed_slots_are_reused_without_aliasing() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let old = dom.create_element("p");
        dom.insert_before(body, old, None);
        dom.remove_child(body, old);

        let new = dom.create_element("p");
        assert_ne!(old, new);
        assert!(!dom.contains(old));
        assert!(dom.contains(new));
        dom.set_attribute(old, "id", "stale");
        assert_eq!(dom.attribute(new, "id"), None);

        for _ in 0..100 {
            let n = dom.create_text("x");
            dom.insert_before(body, n, None);
            dom.remove_child(body, n);
        }
        assert_eq!(dom.slots.len(), 3);
        assert_eq!(dom.live_count(), 1);
        assert_eq!(dom.created_count(), 102);
    }

    #[test]
    fn properties_are_live() {
        let mut dom = MemoryDom::new();
        let input = dom.create_element("input");
        dom.set_property(input, "value", &Value::from("typed"));
        assert_eq!(dom.property(input, "value"), Some(Value::from("typed")));
        dom.remove_property(input, "value");
        assert_eq!(dom.property(input, "value"), None);
    }
}
