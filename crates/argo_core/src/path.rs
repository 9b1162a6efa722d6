//! Dot-delimited paths into a JSON state tree
//!
//! A path like `"fuel.jarak"` names `tree["fuel"]["jarak"]`. Numeric segments
//! index into arrays (`"trips.0.amount"`). Reads never fail: a missing segment
//! simply yields `None`. Writes create missing (or `null`) intermediate
//! containers as objects.

use serde_json::{Map, Value};

use crate::error::StoreError;

/// Split a path into its segments
///
/// The empty path is the root and has no segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|_| !path.is_empty())
}

/// Borrow the value at `path`, or `None` if any segment is missing
///
/// The empty path returns the root itself.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Assign `value` at `path`, returning the value it replaced
///
/// Intermediate objects are created as needed. Fails when the path is empty,
/// when an intermediate value is a scalar, or when an array index is out of
/// range (appending at exactly `len` is allowed for the final segment).
pub fn assign(root: &mut Value, path: &str, value: Value) -> Result<Option<Value>, StoreError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::EmptyPath(path.to_string()));
    }

    let parts: Vec<&str> = path.split('.').collect();
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => return Err(StoreError::EmptyPath(path.to_string())),
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = descend(current, path, &parts[..depth], segment)?;
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.insert((*last).to_string(), value)),
        Value::Array(items) => {
            let len = items.len();
            match last.parse::<usize>() {
                Ok(i) if i < len => Ok(Some(std::mem::replace(&mut items[i], value))),
                Ok(i) if i == len => {
                    items.push(value);
                    Ok(None)
                }
                _ => Err(StoreError::IndexOutOfRange {
                    path: path.to_string(),
                    segment: (*last).to_string(),
                    len,
                }),
            }
        }
        _ => Err(not_a_container(path, parents)),
    }
}

fn descend<'a>(
    current: &'a mut Value,
    path: &str,
    walked: &[&str],
    segment: &str,
) -> Result<&'a mut Value, StoreError> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let len = items.len();
            match segment.parse::<usize>() {
                Ok(i) if i < len => Ok(&mut items[i]),
                _ => Err(StoreError::IndexOutOfRange {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    len,
                }),
            }
        }
        _ => Err(not_a_container(path, walked)),
    }
}

fn not_a_container(path: &str, walked: &[&str]) -> StoreError {
    StoreError::NotAContainer {
        path: path.to_string(),
        segment: walked.join("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_lookup_missing_is_none() {
        let tree = json!({ "fuel": { "jarak": 10 } });
        assert_eq!(lookup(&tree, "fuel.jarak"), Some(&json!(10)));
        assert_eq!(lookup(&tree, "fuel.harga"), None);
        assert_eq!(lookup(&tree, "fuel.jarak.deeper"), None);
        assert_eq!(lookup(&tree, "nope.at.all"), None);
        assert_eq!(lookup(&tree, "fuel..jarak"), None);
    }

    #[test]
    fn test_lookup_empty_path_is_root() {
        let tree = json!({ "a": 1 });
        assert_eq!(lookup(&tree, ""), Some(&tree));
    }

    #[test]
    fn test_lookup_array_index() {
        let tree = json!({ "trips": [{ "amount": 5 }, { "amount": 9 }] });
        assert_eq!(lookup(&tree, "trips.1.amount"), Some(&json!(9)));
        assert_eq!(lookup(&tree, "trips.2.amount"), None);
        assert_eq!(lookup(&tree, "trips.x"), None);
    }

    #[test]
    fn test_assign_creates_intermediates() {
        let mut tree = json!({});
        let old = assign(&mut tree, "a.b.c", json!(3)).unwrap();
        assert_eq!(old, None);
        assert_eq!(lookup(&tree, "a.b"), Some(&json!({ "c": 3 })));
    }

    #[test]
    fn test_assign_replaces_null_intermediate() {
        let mut tree = json!({ "a": null });
        assign(&mut tree, "a.b", json!(true)).unwrap();
        assert_eq!(tree, json!({ "a": { "b": true } }));
    }

    #[test]
    fn test_assign_returns_previous() {
        let mut tree = json!({ "ui": { "currentView": "home" } });
        let old = assign(&mut tree, "ui.currentView", json!("history")).unwrap();
        assert_eq!(old, Some(json!("home")));
    }

    #[test]
    fn test_assign_rejects_empty_paths() {
        let mut tree = json!({});
        assert_eq!(
            assign(&mut tree, "", json!(1)),
            Err(StoreError::EmptyPath(String::new()))
        );
        assert!(matches!(
            assign(&mut tree, "a..b", json!(1)),
            Err(StoreError::EmptyPath(_))
        ));
        assert_eq!(tree, json!({}));
    }

    #[test]
    fn test_assign_through_scalar_fails() {
        let mut tree = json!({ "fuel": 5 });
        let err = assign(&mut tree, "fuel.jarak.km", json!(1)).unwrap_err();
        assert_eq!(
            err,
            StoreError::NotAContainer {
                path: "fuel.jarak.km".into(),
                segment: "fuel".into(),
            }
        );
        assert_eq!(tree, json!({ "fuel": 5 }));
    }

    #[test]
    fn test_assign_array_slots() {
        let mut tree = json!({ "trips": [1, 2] });
        assert_eq!(assign(&mut tree, "trips.0", json!(10)), Ok(Some(json!(1))));
        assert_eq!(assign(&mut tree, "trips.2", json!(3)), Ok(None));
        assert!(matches!(
            assign(&mut tree, "trips.9", json!(0)),
            Err(StoreError::IndexOutOfRange { len: 3, .. })
        ));
        assert_eq!(tree, json!({ "trips": [10, 2, 3] }));
    }

    fn key() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}"
    }

    proptest! {
        #[test]
        fn prop_unwritten_path_reads_none_then_round_trips(
            keys in prop::collection::vec(key(), 1..6),
            n in any::<i64>(),
        ) {
            let path = keys.join(".");
            let mut tree = json!({});
            prop_assert_eq!(lookup(&tree, &path), None);

            assign(&mut tree, &path, json!(n)).unwrap();
            prop_assert_eq!(lookup(&tree, &path), Some(&json!(n)));

            if keys.len() > 1 {
                let parent = keys[..keys.len() - 1].join(".");
                let container = lookup(&tree, &parent).and_then(Value::as_object);
                prop_assert!(container.is_some_and(|m| m.contains_key(keys.last().unwrap())));
            }
        }
    }
}
