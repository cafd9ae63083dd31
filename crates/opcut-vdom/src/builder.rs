#![forbid(unsafe_code)]

//! Turn loose, nested descriptions into normalized virtual nodes.
//!
//! A [`Description`] mirrors the array notation views are written in:
//!
//! ```
//! use opcut_vdom::{build, h, Data, Description};
//!
//! let view: Description = h("div.foo")
//!     .data(Data::new().class("bar", true))
//!     .child("hello")
//!     .child(h("span").child("x"))
//!     .into();
//! let nodes = build(view).unwrap();
//! let div = nodes[0].as_element().unwrap();
//! assert_eq!(div.class_name(), "foo bar");
//! assert_eq!(div.children.len(), 2);
//! ```
//!
//! Normalization rules:
//!
//! - a list starting with text is an element; the text is its selector and an
//!   optional [`Data`] may follow directly;
//! - a list starting with a list, a node or nothing is a fragment whose items
//!   are spliced into the parent;
//! - empty lists, [`Description::Empty`] and `false` vanish;
//! - numbers become text nodes.

use opcut_core::Value;
use opcut_core::value::format_number;

use crate::error::BuildError;
use crate::vnode::{Data, Element, Selector, VNode};

/// Loose view description.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Description {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Data(Data),
    List(Vec<Description>),
    Node(VNode),
}

impl Description {
    /// Convert a JSON-shaped value.
    ///
    /// Strings become text (or a selector at the head of a list), maps become
    /// [`Data`] and `null` becomes [`Description::Empty`].
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(*n),
            Value::String(s) => Self::Text(s.to_string()),
            Value::List(items) => Self::List(items.iter().map(Self::from_value).collect()),
            Value::Map(_) => Self::Data(Data::from_value(value)),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Data(_) => "attribute map",
            Self::List(_) => "list",
            Self::Node(_) => "node",
        }
    }
}

/// Normalize a description into the children of a mount point.
pub fn build(desc: impl Into<Description>) -> Result<Vec<VNode>, BuildError> {
    #[cfg(feature = "tracing")]
    let _span = tracing::trace_span!("build").entered();

    let mut out = Vec::new();
    build_into(desc.into(), &mut out)?;
    Ok(out)
}

fn build_into(desc: Description, out: &mut Vec<VNode>) -> Result<(), BuildError> {
    match desc {
        Description::Empty | Description::Bool(false) => Ok(()),
        Description::Text(text) => {
            out.push(VNode::Text(text));
            Ok(())
        }
        Description::Number(n) => {
            out.push(VNode::Text(format_number(n)));
            Ok(())
        }
        Description::Node(node) => {
            out.push(node);
            Ok(())
        }
        Description::List(items) => build_list(items, out),
        other @ (Description::Bool(true) | Description::Data(_)) => Err(BuildError::invalid(
            format!("bare {} outside of an element", other.shape()),
        )),
    }
}

fn build_list(items: Vec<Description>, out: &mut Vec<VNode>) -> Result<(), BuildError> {
    let mut items = items.into_iter();
    let Some(head) = items.next() else {
        return Ok(());
    };
    match head {
        Description::Text(selector) => {
            let selector = Selector::parse(&selector)?;
            let mut items = items.peekable();
            let data = match items.next_if(|d| matches!(d, Description::Data(_))) {
                Some(Description::Data(data)) => data,
                _ => Data::default(),
            };
            let mut children = Vec::new();
            for child in items {
                build_into(child, &mut children)?;
            }
            out.push(VNode::Element(Element::new(selector, data, children)));
            Ok(())
        }
        head @ (Description::List(_)
        | Description::Node(_)
        | Description::Empty
        | Description::Bool(false)) => {
            build_into(head, out)?;
            items.try_for_each(|item| build_into(item, out))
        }
        other => Err(BuildError::invalid(format!(
            "list starting with a {}",
            other.shape()
        ))),
    }
}

/// Element builder returned by [`h`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ElementBuilder {
    selector: String,
    data: Option<Data>,
    children: Vec<Description>,
}

/// Start an element description from a `tag#id.class` selector.
pub fn h(selector: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        selector: selector.into(),
        data: None,
        children: Vec::new(),
    }
}

impl ElementBuilder {
    pub fn data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    pub fn child(mut self, child: impl Into<Description>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Description>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Build this element alone.
    pub fn build(self) -> Result<VNode, BuildError> {
        let mut nodes = build(self)?;
        nodes
            .pop()
            .ok_or_else(|| BuildError::invalid("element builder produced no node"))
    }
}

impl From<ElementBuilder> for Description {
    fn from(b: ElementBuilder) -> Self {
        let mut items = Vec::with_capacity(b.children.len() + 2);
        items.push(Self::Text(b.selector));
        if let Some(data) = b.data {
            items.push(Self::Data(data));
        }
        items.extend(b.children);
        Self::List(items)
    }
}

impl From<()> for Description {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Description {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Description {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Description {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<bool> for Description {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Description {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Description {
            fn from(n: $t) -> Self {
                Self::Number(n as f64)
            }
        })*
    };
}

impl_from_int!(i32, i64, u32, u64, usize);

impl From<Data> for Description {
    fn from(d: Data) -> Self {
        Self::Data(d)
    }
}

impl From<VNode> for Description {
    fn from(n: VNode) -> Self {
        Self::Node(n)
    }
}

impl From<&Value> for Description {
    fn from(v: &Value) -> Self {
        Self::from_value(v)
    }
}

impl<T: Into<Description>> From<Option<T>> for Description {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Description>> From<Vec<T>> for Description {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
