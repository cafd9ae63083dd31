#![forbid(unsafe_code)]

//! Path-based read and copy-on-write update.
//!
//! Every update returns a new root. Containers on the way from the root to
//! the updated location are shallow-copied; everything else keeps its
//! identity, so `Value::ptr_eq` holds for untouched siblings:
//!
//! ```
//! use opcut_core::{ops, path, Value};
//! use serde_json::json;
//!
//! let state = Value::from(json!({"a": {"x": 1}, "b": {"y": 2}}));
//! let next = ops::set(&path!["a", "x"], &state, Value::from(5)).unwrap();
//!
//! assert_eq!(ops::get(&path!["a", "x"], &next), Some(&Value::from(5)));
//! let b_before = ops::get(&path!["b"], &state).unwrap();
//! let b_after = ops::get(&path!["b"], &next).unwrap();
//! assert!(b_before.ptr_eq(b_after));
//! ```
//!
//! # Creation rules
//!
//! While descending, an absent or `null` location becomes a fresh container
//! of the kind the next segment asks for (`Key` → map, `Index` → list). A
//! location holding a value of the other kind is an [`Error::InvalidPath`].
//! Writing past the end of a list pads the gap with `null`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::path::{Path, Segment};
use crate::value::{Map, Value};

static NULL: Value = Value::Null;

/// Deep structural equality.
///
/// This is also the `PartialEq` implementation of [`Value`].
#[must_use]
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| equals(a, b)))
        }
        (Value::Map(x), Value::Map(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len()
                    && x
                        .iter()
                        .zip(y.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && equals(va, vb)))
        }
        _ => false,
    }
}

/// Read the value at `path`.
///
/// Returns `None` when a key or index is missing or when a segment meets a
/// value it cannot traverse (a primitive, or a container of the other kind).
#[must_use]
pub fn get<'a>(path: &Path, value: &'a Value) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match (segment, current) {
        (Segment::Key(key), Value::Map(map)) => map.get(key),
        (Segment::Index(index), Value::List(items)) => items.get(*index),
        _ => None,
    })
}

/// Like [`get`], but clones the result and maps absence to `null`.
#[must_use]
pub fn get_or_null(path: &Path, value: &Value) -> Value {
    get(path, value).cloned().unwrap_or_default()
}

/// Replace the value at `path` with `f(old)`.
///
/// `f` receives `null` when the location does not exist yet.
pub fn change<F>(path: &Path, value: &Value, f: F) -> Result<Value>
where
    F: FnOnce(&Value) -> Value,
{
    try_change(path, value, |old| Ok::<_, Error>(f(old)))
}

/// Fallible form of [`change`]: the transform may reject the update.
///
/// Path errors are converted into the caller's error type.
pub fn try_change<E, F>(path: &Path, value: &Value, f: F) -> std::result::Result<Value, E>
where
    E: From<Error>,
    F: FnOnce(&Value) -> std::result::Result<Value, E>,
{
    crate::trace!(path = %path, "change");
    change_at(path, 0, value, f)
}

fn change_at<E, F>(path: &Path, pos: usize, current: &Value, f: F) -> std::result::Result<Value, E>
where
    E: From<Error>,
    F: FnOnce(&Value) -> std::result::Result<Value, E>,
{
    let Some(segment) = path.segments().get(pos) else {
        return f(current);
    };
    match segment {
        Segment::Key(key) => {
            let mut map = match current {
                Value::Map(map) => Map::clone(map),
                Value::Null => Map::new(),
                other => return Err(mismatch(path, pos, other).into()),
            };
            let old = map.get(key).unwrap_or(&NULL);
            let new = change_at(path, pos + 1, old, f)?;
            map.insert(key.clone(), new);
            Ok(Value::Map(Arc::new(map)))
        }
        Segment::Index(index) => {
            let mut items = match current {
                Value::List(items) => Vec::clone(items),
                Value::Null => Vec::new(),
                other => return Err(mismatch(path, pos, other).into()),
            };
            let old = items.get(*index).unwrap_or(&NULL);
            let new = change_at(path, pos + 1, old, f)?;
            if *index < items.len() {
                items[*index] = new;
            } else {
                items.resize(*index, Value::Null);
                items.push(new);
            }
            Ok(Value::List(Arc::new(items)))
        }
    }
}

/// Replace the value at `path` with `new`.
pub fn set(path: &Path, value: &Value, new: Value) -> Result<Value> {
    change(path, value, move |_| new)
}

/// Remove the map key or list index addressed by the last segment of `path`.
///
/// Removing something that does not exist returns an equal value. The empty
/// path removes everything and yields `null`.
pub fn omit(path: &Path, value: &Value) -> Result<Value> {
    let Some((last, init)) = path.segments().split_last() else {
        return Ok(Value::Null);
    };
    let parent: Path = init.iter().cloned().collect();
    validate(&parent, value)?;
    match get(&parent, value) {
        None | Some(Value::Null) => return Ok(value.clone()),
        Some(_) => {}
    }
    let last_pos = init.len();
    try_change(&parent, value, |container| match (last, container) {
        (Segment::Key(key), Value::Map(map)) => {
            if !map.contains_key(key) {
                return Ok(container.clone());
            }
            let mut map = Map::clone(map);
            map.remove(key);
            Ok(Value::Map(Arc::new(map)))
        }
        (Segment::Index(index), Value::List(items)) => {
            if *index >= items.len() {
                return Ok(container.clone());
            }
            let mut items = Vec::clone(items);
            items.remove(*index);
            Ok(Value::List(Arc::new(items)))
        }
        (_, other) => Err(mismatch(path, last_pos, other)),
    })
}

/// Check that every existing location along `path` has the kind its segment
/// asks for. Traversal stops quietly at the first absent location.
pub fn validate(path: &Path, value: &Value) -> Result<()> {
    let mut current = value;
    for (pos, segment) in path.iter().enumerate() {
        let next = match (segment, current) {
            (_, Value::Null) => return Ok(()),
            (Segment::Key(key), Value::Map(map)) => map.get(key),
            (Segment::Index(index), Value::List(items)) => items.get(*index),
            (_, other) => return Err(mismatch(path, pos, other)),
        };
        match next {
            Some(next) => current = next,
            None => return Ok(()),
        }
    }
    Ok(())
}

fn mismatch(path: &Path, pos: usize, found: &Value) -> Error {
    let reason = match &path.segments()[pos] {
        Segment::Key(key) => format!("key `{key}` applied to a {}", found.kind()),
        Segment::Index(index) => format!("index {index} applied to a {}", found.kind()),
    };
    Error::invalid_path(path, pos, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn equals_is_deep_and_type_strict() {
        assert!(equals(&v(json!({"a": [1, {"b": null}]})), &v(json!({"a": [1, {"b": null}]}))));
        assert!(!equals(&v(json!({"a": 1})), &v(json!({"a": 1, "b": 2}))));
        assert!(!equals(&v(json!([1, 2])), &v(json!([2, 1]))));
        assert!(!equals(&v(json!([])), &v(json!({}))));
        assert!(!equals(&v(json!("1")), &v(json!(1))));
    }

    #[test]
    fn get_returns_none_for_missing_or_untraversable() {
        let state = v(json!({"a": {"b": [10, 20]}, "s": "text"}));
        assert_eq!(get(&path!["a", "b", 1usize], &state), Some(&Value::from(20)));
        assert_eq!(get(&path!["a", "c"], &state), None);
        assert_eq!(get(&path!["a", "b", 5usize], &state), None);
        assert_eq!(get(&path!["s", "x"], &state), None);
        assert_eq!(get(&path!["a", 0usize], &state), None);
        assert_eq!(get(&Path::root(), &state), Some(&state));
    }

    #[test]
    fn change_creates_missing_containers() {
        let out = set(&path!["a", "b", 2usize], &Value::Null, Value::from("x")).unwrap();
        assert_eq!(out, v(json!({"a": {"b": [null, null, "x"]}})));
    }

    #[test]
    fn change_on_empty_path_transforms_root() {
        let out = change(&Path::root(), &Value::from(2), |old| {
            Value::from(old.as_f64().unwrap_or(0.0) * 10.0)
        })
        .unwrap();
        assert_eq!(out, Value::from(20));
    }

    #[test]
    fn change_rejects_kind_mismatch() {
        let state = v(json!({"list": [1, 2], "n": 3}));
        let err = set(&path!["list", "k"], &state, Value::Null).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { position: 1, .. }), "{err}");
        let err = set(&path!["n", 0usize], &state, Value::Null).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { position: 1, .. }), "{err}");
    }

    #[test]
    fn change_shares_untouched_siblings() {
        let state = v(json!({"a": {"x": 1}, "b": {"y": [1, 2]}}));
        let next = set(&path!["a", "x"], &state, Value::from(2)).unwrap();
        assert!(!state.ptr_eq(&next));
        assert!(get(&path!["b"], &state).unwrap().ptr_eq(get(&path!["b"], &next).unwrap()));
        assert_eq!(get(&path!["a", "x"], &state), Some(&Value::from(1)));
    }

    #[test]
    fn try_change_propagates_transform_error() {
        #[derive(Debug, PartialEq)]
        enum E {
            Path,
            Rejected,
        }
        impl From<Error> for E {
            fn from(_: Error) -> Self {
                E::Path
            }
        }
        let state = v(json!({"a": 1}));
        let out: std::result::Result<Value, E> =
            try_change(&path!["a"], &state, |_| Err(E::Rejected));
        assert_eq!(out.unwrap_err(), E::Rejected);
        let out: std::result::Result<Value, E> =
            try_change(&path!["a", "b"], &state, |old| Ok(old.clone()));
        assert_eq!(out.unwrap_err(), E::Path);
    }

    #[test]
    fn omit_removes_key_and_index() {
        let state = v(json!({"a": {"x": 1, "y": 2}, "l": [1, 2, 3]}));
        assert_eq!(
            omit(&path!["a", "x"], &state).unwrap(),
            v(json!({"a": {"y": 2}, "l": [1, 2, 3]}))
        );
        assert_eq!(
            omit(&path!["l", 1usize], &state).unwrap(),
            v(json!({"a": {"x": 1, "y": 2}, "l": [1, 3]}))
        );
    }

    #[test]
    fn omit_missing_is_noop_and_mismatch_fails() {
        let state = v(json!({"a": {"x": 1}, "l": [1]}));
        assert_eq!(omit(&path!["a", "nope"], &state).unwrap(), state);
        assert_eq!(omit(&path!["missing", "deep"], &state).unwrap(), state);
        assert_eq!(omit(&path!["l", 9usize], &state).unwrap(), state);
        assert!(omit(&path!["l", "k"], &state).is_err());
        assert!(omit(&path!["a", 0usize, "k"], &state).is_err());
        assert_eq!(omit(&Path::root(), &state).unwrap(), Value::Null);
    }
}
