#![forbid(unsafe_code)]

//! Higher-order operations over lists and maps.
//!
//! Each function dispatches on the runtime shape of its input: lists are
//! processed element by element, maps value by value with keys preserved.
//! Handing a primitive to an operation that needs a container fails with
//! [`Error::NotAContainer`]. `null` counts as an empty container wherever a
//! result can still be produced (`append`, `concat`, `merge`).

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::ops::equals;
use crate::value::{Map, Value};

/// Apply `f` to every element (list) or value (map).
pub fn map<F>(value: &Value, mut f: F) -> Result<Value>
where
    F: FnMut(&Value) -> Value,
{
    match value {
        Value::List(items) => Ok(items.iter().map(f).collect()),
        Value::Map(entries) => Ok(entries.iter().map(|(k, v)| (k.clone(), f(v))).collect()),
        other => Err(Error::not_a_container("map", other.kind())),
    }
}

/// Keep the elements (list) or entries (map) for which `pred` holds.
pub fn filter<F>(value: &Value, mut pred: F) -> Result<Value>
where
    F: FnMut(&Value) -> bool,
{
    match value {
        Value::List(items) => Ok(items.iter().filter(|v| pred(v)).cloned().collect()),
        Value::Map(entries) => Ok(entries
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        other => Err(Error::not_a_container("filter", other.kind())),
    }
}

/// Fold the elements (list) or values (map, in key order).
pub fn reduce<T, F>(value: &Value, init: T, mut f: F) -> Result<T>
where
    F: FnMut(T, &Value) -> T,
{
    match value {
        Value::List(items) => Ok(items.iter().fold(init, |acc, v| f(acc, v))),
        Value::Map(entries) => Ok(entries.values().fold(init, |acc, v| f(acc, v))),
        other => Err(Error::not_a_container("reduce", other.kind())),
    }
}

/// Append `item` to the end of a list.
pub fn append(value: &Value, item: Value) -> Result<Value> {
    let mut items = list_or_empty("append", value)?;
    items.push(item);
    Ok(Value::from(items))
}

/// Insert `item` before `index`; an index past the end appends.
pub fn insert(value: &Value, index: usize, item: Value) -> Result<Value> {
    let mut items = list_or_empty("insert", value)?;
    let index = index.min(items.len());
    items.insert(index, item);
    Ok(Value::from(items))
}

/// Concatenate two lists.
pub fn concat(a: &Value, b: &Value) -> Result<Value> {
    let mut items = list_or_empty("concat", a)?;
    items.extend(list_or_empty("concat", b)?);
    Ok(Value::from(items))
}

/// Sub-map containing only `keys` that are present.
pub fn pick<K: AsRef<str>>(keys: &[K], value: &Value) -> Result<Value> {
    let Value::Map(entries) = value else {
        return Err(Error::not_a_container("pick", value.kind()));
    };
    Ok(keys
        .iter()
        .filter_map(|k| {
            entries
                .get_key_value(k.as_ref())
                .map(|(k, v)| (k.clone(), v.clone()))
        })
        .collect())
}

/// Shallow merge of two maps; entries of `b` win.
pub fn merge(a: &Value, b: &Value) -> Result<Value> {
    let mut out = map_or_empty("merge", a)?;
    for (k, v) in map_or_empty("merge", b)? {
        out.insert(k, v);
    }
    Ok(Value::from(out))
}

/// Merge a sequence of maps left to right.
pub fn merge_all<'a, I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .try_fold(Value::map(), |acc, v| merge(&acc, v))
}

/// Pair up two lists element-wise; the shorter one is padded with `null`.
pub fn zip(a: &Value, b: &Value) -> Result<Value> {
    let (Value::List(xs), Value::List(ys)) = (a, b) else {
        let kind = if a.as_list().is_some() { b.kind() } else { a.kind() };
        return Err(Error::not_a_container("zip", kind));
    };
    let len = xs.len().max(ys.len());
    Ok((0..len)
        .map(|i| {
            Value::from(vec![
                xs.get(i).cloned().unwrap_or_default(),
                ys.get(i).cloned().unwrap_or_default(),
            ])
        })
        .collect())
}

/// Collapse arbitrarily nested lists into one flat list.
///
/// A non-list input yields a one-element list.
#[must_use]
pub fn flatten(value: &Value) -> Value {
    fn walk(value: &Value, out: &mut Vec<Value>) {
        match value {
            Value::List(items) => items.iter().for_each(|v| walk(v, out)),
            other => out.push(other.clone()),
        }
    }
    let mut out = Vec::new();
    walk(value, &mut out);
    Value::from(out)
}

/// Stable sort of a list by a derived key.
///
/// Incomparable keys (e.g. `NaN`) are treated as equal.
pub fn sort_by<K, F>(value: &Value, mut key: F) -> Result<Value>
where
    K: PartialOrd,
    F: FnMut(&Value) -> K,
{
    let Value::List(items) = value else {
        return Err(Error::not_a_container("sort_by", value.kind()));
    };
    let mut keyed: Vec<(K, Value)> = items.iter().map(|v| (key(v), v.clone())).collect();
    keyed.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Ok(keyed.into_iter().map(|(_, v)| v).collect())
}

/// First element (list) or value (map) matching `pred`.
pub fn find<F>(value: &Value, mut pred: F) -> Result<Option<Value>>
where
    F: FnMut(&Value) -> bool,
{
    match value {
        Value::List(items) => Ok(items.iter().find(|v| pred(v)).cloned()),
        Value::Map(entries) => Ok(entries.values().find(|v| pred(v)).cloned()),
        other => Err(Error::not_a_container("find", other.kind())),
    }
}

/// Whether any element (list) or value (map) equals `needle`.
pub fn contains(value: &Value, needle: &Value) -> Result<bool> {
    find(value, |v| equals(v, needle)).map(|found| found.is_some())
}

/// Entries of a map as `(key, value)` pairs in key order.
pub fn to_pairs(value: &Value) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Map(entries) => Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        other => Err(Error::not_a_container("to_pairs", other.kind())),
    }
}

/// Build a map from `(key, value)` pairs; later duplicates win.
pub fn from_pairs<I, K>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

fn list_or_empty(op: &'static str, value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => Ok(Vec::clone(items)),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::not_a_container(op, other.kind())),
    }
}

fn map_or_empty(op: &'static str, value: &Value) -> Result<Map> {
    match value {
        Value::Map(entries) => Ok(Map::clone(entries)),
        Value::Null => Ok(Map::new()),
        other => Err(Error::not_a_container(op, other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn map_and_filter_dispatch_on_shape() {
        let double = |x: &Value| Value::from(x.as_f64().unwrap_or(0.0) * 2.0);
        assert_eq!(map(&v(json!([1, 2])), double).unwrap(), v(json!([2, 4])));
        assert_eq!(map(&v(json!({"a": 1})), double).unwrap(), v(json!({"a": 2})));
        let odd = |x: &Value| x.as_i64().is_some_and(|n| n % 2 == 1);
        assert_eq!(filter(&v(json!([1, 2, 3])), odd).unwrap(), v(json!([1, 3])));
        assert_eq!(filter(&v(json!({"a": 1, "b": 2})), odd).unwrap(), v(json!({"a": 1})));
        assert_eq!(
            map(&Value::from(3), double).unwrap_err(),
            Error::NotAContainer { op: "map", kind: ValueKind::Number }
        );
    }

    #[test]
    fn reduce_sums_values() {
        let sum = |acc: f64, x: &Value| acc + x.as_f64().unwrap_or(0.0);
        assert_eq!(reduce(&v(json!([1, 2, 3])), 0.0, sum).unwrap(), 6.0);
        assert_eq!(reduce(&v(json!({"a": 4, "b": 5})), 0.0, sum).unwrap(), 9.0);
    }

    #[test]
    fn append_insert_concat() {
        assert_eq!(append(&Value::Null, Value::from(1)).unwrap(), v(json!([1])));
        assert_eq!(insert(&v(json!([1, 3])), 1, Value::from(2)).unwrap(), v(json!([1, 2, 3])));
        assert_eq!(insert(&v(json!([1])), 9, Value::from(2)).unwrap(), v(json!([1, 2])));
        assert_eq!(concat(&v(json!([1])), &v(json!([2, 3]))).unwrap(), v(json!([1, 2, 3])));
        assert!(append(&v(json!({})), Value::Null).is_err());
    }

    #[test]
    fn pick_and_merge() {
        let m = v(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(pick(&["a", "c", "z"], &m).unwrap(), v(json!({"a": 1, "c": 3})));
        assert_eq!(
            merge(&v(json!({"a": 1, "b": 1})), &v(json!({"b": 2}))).unwrap(),
            v(json!({"a": 1, "b": 2}))
        );
        let parts = [v(json!({"a": 1})), v(json!({"b": 2})), v(json!({"a": 3}))];
        assert_eq!(merge_all(&parts).unwrap(), v(json!({"a": 3, "b": 2})));
    }

    #[test]
    fn zip_pads_shorter_list() {
        assert_eq!(
            zip(&v(json!([1, 2])), &v(json!(["a"]))).unwrap(),
            v(json!([[1, "a"], [2, null]]))
        );
        assert!(zip(&v(json!([1])), &Value::from(1)).is_err());
    }

    #[test]
    fn flatten_collapses_nesting() {
        assert_eq!(flatten(&v(json!([1, [2, [3, [4]]], []]))), v(json!([1, 2, 3, 4])));
        assert_eq!(flatten(&Value::from("x")), v(json!(["x"])));
    }

    #[test]
    fn sort_by_is_stable() {
        let rows = v(json!([{"n": 2, "i": 0}, {"n": 1, "i": 1}, {"n": 2, "i": 2}]));
        let sorted = sort_by(&rows, |r| {
            r.as_map().and_then(|m| m.get("n")).and_then(Value::as_f64)
        })
        .unwrap();
        assert_eq!(sorted, v(json!([{"n": 1, "i": 1}, {"n": 2, "i": 0}, {"n": 2, "i": 2}])));
    }

    #[test]
    fn find_contains_and_pairs() {
        let l = v(json!([1, {"a": 1}]));
        assert!(contains(&l, &v(json!({"a": 1}))).unwrap());
        assert!(!contains(&l, &Value::from(2)).unwrap());
        assert_eq!(find(&l, Value::is_container).unwrap(), Some(v(json!({"a": 1}))));
        let pairs = to_pairs(&v(json!({"b": 2, "a": 1}))).unwrap();
        assert_eq!(pairs[0], ("a".to_string(), Value::from(1)));
        assert_eq!(from_pairs(pairs), v(json!({"a": 1, "b": 2})));
    }
}
