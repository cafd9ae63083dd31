#![forbid(unsafe_code)]

//! Apply a new virtual tree to the host with minimal DOM writes.
//!
//! The reconciler keeps the previously applied tree together with the host
//! node of every virtual node. Each [`Reconciler::render`] diffs the new
//! children of the mount point against it:
//!
//! - keyed elements match the old element with the same key and tag;
//! - unkeyed nodes match the unkeyed old sibling at the same unkeyed
//!   position, provided kind and tag agree;
//! - matched nodes are patched in place and moved only when out of order;
//! - unmatched old nodes are removed and unmatched new nodes created.

use std::collections::{BTreeMap, HashMap};
use std::mem;

use crate::dom::Dom;
use crate::vnode::{DomEvent, Element, Listener, VNode};

/// DOM writes performed by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub created: usize,
    pub removed: usize,
    pub moved: usize,
    pub text_updates: usize,
    pub attributes: usize,
    pub properties: usize,
    pub classes: usize,
    pub listeners: usize,
}

impl PatchStats {
    /// Total number of host mutations.
    #[must_use]
    pub const fn dom_writes(&self) -> usize {
        self.created
            + self.removed
            + self.moved
            + self.text_updates
            + self.attributes
            + self.properties
            + self.classes
            + self.listeners
    }

    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.dom_writes() == 0
    }
}

/// A virtual node bound to its host node. For elements, `vnode` holds the
/// header only; children live in `children`.
#[derive(Debug)]
struct Mounted<N> {
    node: N,
    vnode: VNode,
    children: Vec<Mounted<N>>,
}

/// Retained-tree reconciler for one mount point.
#[derive(Debug)]
pub struct Reconciler<N> {
    mount: N,
    tree: Option<Vec<Mounted<N>>>,
    handlers: HashMap<N, BTreeMap<String, Listener>>,
}

impl<N> Reconciler<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    #[must_use]
    pub fn new(mount: N) -> Self {
        Self {
            mount,
            tree: None,
            handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn mount(&self) -> N {
        self.mount
    }

    /// Whether a tree is currently applied.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.tree.is_some()
    }

    /// Host nodes of the mount point's children, in order.
    #[must_use]
    pub fn root_nodes(&self) -> Vec<N> {
        self.tree
            .iter()
            .flatten()
            .map(|m| m.node)
            .collect()
    }

    /// Handler currently bound to `event` on `node`.
    #[must_use]
    pub fn listener(&self, node: N, event: &str) -> Option<&Listener> {
        self.handlers.get(&node)?.get(event)
    }

    /// Invoke the handler bound to `event.name` on `node`.
    ///
    /// Returns whether a handler ran.
    pub fn dispatch(&self, node: N, event: &DomEvent) -> bool {
        match self.listener(node, &event.name) {
            Some(listener) => {
                listener.call(event);
                true
            }
            None => false,
        }
    }

    /// Make the mount point's children match `tree`.
    ///
    /// The first render clears whatever the mount point held. An empty
    /// `tree` tears everything down.
    pub fn render<D>(&mut self, dom: &mut D, tree: Vec<VNode>) -> PatchStats
    where
        D: Dom<Node = N>,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("reconcile", roots = tree.len()).entered();

        if tree.is_empty() {
            return self.teardown(dom);
        }
        let mut stats = PatchStats::default();
        let old = match self.tree.take() {
            Some(old) => old,
            None => {
                self.clear_mount(dom, &mut stats);
                Vec::new()
            }
        };
        let mount = self.mount;
        let mounted = self.patch_children(dom, mount, old, tree, &mut stats);
        self.tree = Some(mounted);

        #[cfg(feature = "tracing")]
        tracing::trace!(?stats, "reconciled");
        stats
    }

    /// Remove every child of the mount point and forget the retained tree.
    pub fn teardown<D>(&mut self, dom: &mut D) -> PatchStats
    where
        D: Dom<Node = N>,
    {
        let mut stats = PatchStats::default();
        self.clear_mount(dom, &mut stats);
        self.tree = None;
        self.handlers.clear();
        stats
    }

    fn clear_mount<D: Dom<Node = N>>(&mut self, dom: &mut D, stats: &mut PatchStats) {
        while let Some(child) = dom.first_child(self.mount) {
            dom.remove_child(self.mount, child);
            stats.removed += 1;
        }
        self.handlers.clear();
    }

    fn patch_children<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        parent: N,
        old: Vec<Mounted<N>>,
        new: Vec<VNode>,
        stats: &mut PatchStats,
    ) -> Vec<Mounted<N>> {
        let mut keyed: HashMap<(String, String), usize> = HashMap::new();
        let mut unkeyed: Vec<usize> = Vec::new();
        for (i, m) in old.iter().enumerate() {
            match match_key(&m.vnode) {
                Some(k) => {
                    keyed.insert(k, i);
                }
                None => unkeyed.push(i),
            }
        }
        let mut slots: Vec<Option<Mounted<N>>> = old.into_iter().map(Some).collect();
        // Unkeyed matches only move forward; skipped old siblings are removed.
        let mut unkeyed_from = 0;

        let mut out: Vec<(Mounted<N>, bool)> = Vec::with_capacity(new.len());
        for vnode in new {
            let candidate = match match_key(&vnode) {
                Some(k) => keyed.remove(&k),
                None => {
                    let found = unkeyed[unkeyed_from..].iter().position(|&i| {
                        slots
                            .get(i)
                            .and_then(Option::as_ref)
                            .is_some_and(|m| m.vnode.same_kind(&vnode))
                    });
                    found.map(|offset| {
                        unkeyed_from += offset + 1;
                        unkeyed[unkeyed_from - 1]
                    })
                }
            };
            let reused = candidate
                .and_then(|i| slots.get_mut(i))
                .filter(|slot| slot.as_ref().is_some_and(|m| m.vnode.same_kind(&vnode)))
                .and_then(Option::take);
            match reused {
                Some(m) => out.push((self.patch(dom, parent, m, vnode, stats), false)),
                None => out.push((self.create(dom, vnode, stats), true)),
            }
        }

        for m in slots.into_iter().flatten() {
            self.forget(&m);
            dom.remove_child(parent, m.node);
            stats.removed += 1;
        }

        // Everything before `cursor` is already in final order.
        let mut cursor = dom.first_child(parent);
        for (m, fresh) in &out {
            if !*fresh && cursor == Some(m.node) {
                cursor = dom.next_sibling(m.node);
            } else {
                dom.insert_before(parent, m.node, cursor);
                if !*fresh {
                    stats.moved += 1;
                }
            }
        }
        out.into_iter().map(|(m, _)| m).collect()
    }

    fn create<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        vnode: VNode,
        stats: &mut PatchStats,
    ) -> Mounted<N> {
        stats.created += 1;
        match vnode {
            VNode::Text(text) => {
                let node = dom.create_text(&text);
                Mounted {
                    node,
                    vnode: VNode::Text(text),
                    children: Vec::new(),
                }
            }
            VNode::Element(mut el) => {
                let node = dom.create_element(&el.tag);
                let kids = mem::take(&mut el.children);
                self.patch_element(dom, node, None, &el, stats);
                let children = kids
                    .into_iter()
                    .map(|kid| {
                        let m = self.create(dom, kid, stats);
                        dom.insert_before(node, m.node, None);
                        m
                    })
                    .collect();
                Mounted {
                    node,
                    vnode: VNode::Element(el),
                    children,
                }
            }
        }
    }

    fn patch<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        parent: N,
        old: Mounted<N>,
        vnode: VNode,
        stats: &mut PatchStats,
    ) -> Mounted<N> {
        let Mounted {
            node,
            vnode: old_vnode,
            children,
        } = old;
        match (old_vnode, vnode) {
            (VNode::Text(old_text), VNode::Text(text)) => {
                if old_text != text {
                    dom.set_text(node, &text);
                    stats.text_updates += 1;
                }
                Mounted {
                    node,
                    vnode: VNode::Text(text),
                    children,
                }
            }
            (VNode::Element(old_el), VNode::Element(mut el)) => {
                let kids = mem::take(&mut el.children);
                self.patch_element(dom, node, Some(&old_el), &el, stats);
                let children = self.patch_children(dom, node, children, kids, stats);
                Mounted {
                    node,
                    vnode: VNode::Element(el),
                    children,
                }
            }
            // Kind changed: replace. The caller's ordering pass moves the
            // fresh node into place.
            (old_vnode, vnode) => {
                self.forget(&Mounted {
                    node,
                    vnode: old_vnode,
                    children,
                });
                dom.remove_child(parent, node);
                stats.removed += 1;
                let fresh = self.create(dom, vnode, stats);
                dom.insert_before(parent, fresh.node, None);
                fresh
            }
        }
    }

    fn patch_element<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        node: N,
        old: Option<&Element>,
        new: &Element,
        stats: &mut PatchStats,
    ) {
        let old_attrs = old.map(Element::host_attributes).unwrap_or_default();
        let new_attrs = new.host_attributes();
        for (name, value) in &new_attrs {
            if old_attrs.get(name) != Some(value) {
                dom.set_attribute(node, name, value);
                stats.attributes += 1;
            }
        }
        for name in old_attrs.keys().filter(|k| !new_attrs.contains_key(*k)) {
            dom.remove_attribute(node, name);
            stats.attributes += 1;
        }

        let old_props = old.map(|el| &el.data.props);
        for (name, value) in &new.data.props {
            let stale = old_props.and_then(|p| p.get(name)) != Some(value)
                || dom.property(node, name).as_ref() != Some(value);
            if stale {
                dom.set_property(node, name, value);
                stats.properties += 1;
            }
        }
        if let Some(old_props) = old_props {
            for name in old_props.keys().filter(|k| !new.data.props.contains_key(*k)) {
                dom.remove_property(node, name);
                stats.properties += 1;
            }
        }

        let old_classes = old.map(Element::class_list).unwrap_or_default();
        let new_classes = new.class_list();
        for class in &new_classes {
            if !old_classes.contains(class) {
                dom.set_class(node, class, true);
                stats.classes += 1;
            }
        }
        for class in old_classes.iter().filter(|c| !new_classes.contains(c)) {
            dom.set_class(node, class, false);
            stats.classes += 1;
        }

        let old_on = old.map(|el| &el.data.on);
        for event in new.data.on.keys() {
            if !old_on.is_some_and(|on| on.contains_key(event)) {
                dom.add_listener(node, event);
                stats.listeners += 1;
            }
        }
        if let Some(old_on) = old_on {
            for event in old_on.keys().filter(|k| !new.data.on.contains_key(*k)) {
                dom.remove_listener(node, event);
                stats.listeners += 1;
            }
        }
        if new.data.on.is_empty() {
            self.handlers.remove(&node);
        } else {
            self.handlers.insert(node, new.data.on.clone());
        }
    }

    fn forget(&mut self, m: &Mounted<N>) {
        self.handlers.remove(&m.node);
        for child in &m.children {
            self.forget(child);
        }
    }
}

fn match_key(vnode: &VNode) -> Option<(String, String)> {
    let el = vnode.as_element()?;
    Some((el.key()?.to_owned(), el.tag.clone()))
}
