#![forbid(unsafe_code)]

//! Virtual nodes: the normalized output of the builder and the input of the
//! reconciler.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use opcut_core::Value;
use smallvec::SmallVec;

use crate::error::BuildError;

/// Event delivered to a [`Listener`].
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    /// Event name, e.g. `"click"` or `"change"`.
    pub name: String,
    /// Host-provided details. Input events carry the new `value` here.
    pub payload: Value,
}

impl DomEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The `value` entry of a map payload, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.payload.as_map().and_then(|m| m.get("value"))
    }
}

/// Reference-counted event handler.
///
/// Two listeners are equal only if they are the same allocation.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&DomEvent)>);

impl Listener {
    pub fn new(f: impl Fn(&DomEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &DomEvent) {
        (self.0)(event);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

/// Per-element data: everything an element carries besides tag and selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    /// Reconciliation key; keyed siblings are matched by key and tag.
    pub key: Option<String>,
    pub attrs: BTreeMap<String, String>,
    /// Live DOM properties (`value`, `checked`, ...).
    pub props: BTreeMap<String, Value>,
    /// Class toggles merged with the selector classes.
    pub class: BTreeMap<String, bool>,
    /// Rendered as `data-*` attributes.
    pub dataset: BTreeMap<String, String>,
    pub on: BTreeMap<String, Listener>,
}

impl Data {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn class(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.class.insert(name.into(), enabled);
        self
    }

    #[must_use]
    pub fn dataset(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dataset.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn on(mut self, event: impl Into<String>, f: impl Fn(&DomEvent) + 'static) -> Self {
        self.on.insert(event.into(), Listener::new(f));
        self
    }

    #[must_use]
    pub fn on_listener(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.on.insert(event.into(), listener);
        self
    }

    /// Read data from a JSON-shaped map with `attrs`, `props`, `class`,
    /// `dataset` and `key` entries. Unknown entries are ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut data = Self::new();
        let Some(map) = value.as_map() else {
            return data;
        };
        let entries = |name: &str| {
            map.get(name)
                .and_then(Value::as_map)
                .into_iter()
                .flat_map(|m| m.iter())
        };
        data.key = map.get("key").and_then(scalar_text);
        data.attrs = entries("attrs")
            .filter_map(|(k, v)| scalar_text(v).map(|s| (k.clone(), s)))
            .collect();
        data.props = entries("props").map(|(k, v)| (k.clone(), v.clone())).collect();
        data.class = entries("class")
            .map(|(k, v)| (k.clone(), v.is_truthy()))
            .collect();
        data.dataset = entries("dataset")
            .filter_map(|(k, v)| scalar_text(v).map(|s| (k.clone(), s)))
            .collect();
        data
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_string()),
        Value::Number(n) => Some(opcut_core::value::format_number(*n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parsed `tag#id.class` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tag: String,
    pub id: Option<String>,
    pub classes: SmallVec<[String; 2]>,
}

impl Selector {
    /// Parse `tag(#id)?(.class)*`; id and classes may appear in any order.
    pub fn parse(selector: &str) -> Result<Self, BuildError> {
        let end = selector.find(['#', '.']).unwrap_or(selector.len());
        let tag = &selector[..end];
        if tag.is_empty() {
            return Err(BuildError::invalid(format!(
                "selector `{selector}` has no tag"
            )));
        }
        let mut out = Self {
            tag: tag.to_owned(),
            id: None,
            classes: SmallVec::new(),
        };
        let mut rest = &selector[end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let len = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..len];
            if !name.is_empty() {
                if marker == '#' {
                    out.id = Some(name.to_owned());
                } else if !out.classes.iter().any(|c| c == name) {
                    out.classes.push(name.to_owned());
                }
            }
            rest = &body[len..];
        }
        Ok(out)
    }
}

/// Normalized element node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    /// Classes from the selector, in selector order.
    pub classes: SmallVec<[String; 2]>,
    pub data: Data,
    pub children: Vec<VNode>,
}

impl Element {
    #[must_use]
    pub fn new(selector: Selector, data: Data, children: Vec<VNode>) -> Self {
        Self {
            tag: selector.tag,
            id: selector.id,
            classes: selector.classes,
            data,
            children,
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.data.key.as_deref()
    }

    /// Effective class list: selector classes in order, then enabled
    /// `data.class` entries not already present.
    #[must_use]
    pub fn class_list(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        for (name, _) in self.data.class.iter().filter(|(_, on)| **on) {
            if !out.contains(&name.as_str()) {
                out.push(name.as_str());
            }
        }
        out
    }

    /// [`Element::class_list`] joined with spaces.
    #[must_use]
    pub fn class_name(&self) -> String {
        self.class_list().join(" ")
    }

    /// Attributes as written to the host: `attrs`, `id`, and `data-*`.
    pub(crate) fn host_attributes(&self) -> BTreeMap<String, String> {
        let mut out = self.data.attrs.clone();
        if let Some(id) = &self.id {
            out.insert("id".to_owned(), id.clone());
        }
        for (name, value) in &self.data.dataset {
            out.insert(format!("data-{name}"), value.clone());
        }
        out
    }
}

/// A node of the virtual tree.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Text(String),
    Element(Element),
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.as_element().and_then(Element::key)
    }

    /// Whether the reconciler may patch `self` into `other` in place.
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(_), Self::Text(_)) => true,
            (Self::Element(a), Self::Element(b)) => a.tag == b.tag && a.key() == b.key(),
            _ => false,
        }
    }
}
