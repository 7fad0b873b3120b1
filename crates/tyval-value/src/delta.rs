//! Schema-free value operations: structural hash, equality, diff and patch.
//!
//! A diff is an ordered edit script keyed by JSON pointers. Objects emit
//! inserts for new keys, then updates for shared keys (recursively), then
//! deletes for removed keys. Arrays recurse over the common prefix, append
//! new trailing elements in ascending order and remove surplus ones from the
//! end. Anything else that differs is replaced wholesale with an update.

use serde::Serialize;
use tyval_core::pointer;
use tyval_core::{digest_value, PatchError, Value, ValueDigest};

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Edit {
    Insert { path: String, value: Value },
    Update { path: String, value: Value },
    Delete { path: String },
}

impl Edit {
    pub fn path(&self) -> &str {
        match self {
            Edit::Insert { path, .. } | Edit::Update { path, .. } | Edit::Delete { path } => path,
        }
    }
}

/// Structural hash, stable under object key reordering.
pub fn hash(value: &Value) -> ValueDigest {
    digest_value(value)
}

/// Deep structural equality. Object key order is ignored.
pub fn equal(left: &Value, right: &Value) -> bool {
    left == right
}

/// The edit script turning `from` into `to`.
pub fn diff(from: &Value, to: &Value) -> Vec<Edit> {
    let mut edits = Vec::new();
    diff_at("", from, to, &mut edits);
    edits
}

fn diff_at(path: &str, from: &Value, to: &Value, edits: &mut Vec<Edit>) {
    match (from, to) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, v) in b.iter().filter(|(k, _)| !a.contains_key(k.as_str())) {
                edits.push(Edit::Insert {
                    path: pointer::push(path, key),
                    value: v.clone(),
                });
            }
            for (key, old) in a {
                if let Some(new) = b.get(key.as_str()) {
                    diff_at(&pointer::push(path, key), old, new, edits);
                }
            }
            for key in a.keys().filter(|k| !b.contains_key(k.as_str())) {
                edits.push(Edit::Delete {
                    path: pointer::push(path, key),
                });
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for (i, (old, new)) in a.iter().zip(b).enumerate() {
                diff_at(&pointer::push(path, &i.to_string()), old, new, edits);
            }
            for (i, v) in b.iter().enumerate().skip(a.len()) {
                edits.push(Edit::Insert {
                    path: pointer::push(path, &i.to_string()),
                    value: v.clone(),
                });
            }
            for i in (b.len()..a.len()).rev() {
                edits.push(Edit::Delete {
                    path: pointer::push(path, &i.to_string()),
                });
            }
        }
        _ if from == to => {}
        _ => edits.push(Edit::Update {
            path: path.to_string(),
            value: to.clone(),
        }),
    }
}

/// Replay an edit script against `base`.
pub fn patch(base: &Value, edits: &[Edit]) -> Result<Value, PatchError> {
    let mut out = base.clone();
    for edit in edits {
        apply(&mut out, edit)?;
    }
    Ok(out)
}

fn apply(root: &mut Value, edit: &Edit) -> Result<(), PatchError> {
    let path = edit.path();
    let mut tokens = pointer::parse(path)?;
    let Some(last) = tokens.pop() else {
        return match edit {
            Edit::Update { value, .. } => {
                *root = value.clone();
                Ok(())
            }
            Edit::Insert { .. } | Edit::Delete { .. } => Err(PatchError::RootEdit),
        };
    };
    let not_found = || PatchError::PathNotFound { path: path.to_string() };
    let parent = tokens.iter().try_fold(root, |current, token| match current {
        Value::Object(map) => map.get_mut(token.as_str()),
        Value::Array(items) => pointer::parse_index(token).and_then(move |i| items.get_mut(i)),
        _ => None,
    });
    let parent = parent.ok_or_else(not_found)?;
    match parent {
        Value::Object(map) => match edit {
            Edit::Insert { value, .. } => {
                map.insert(last, value.clone());
            }
            Edit::Update { value, .. } => {
                let slot = map.get_mut(last.as_str()).ok_or_else(not_found)?;
                *slot = value.clone();
            }
            Edit::Delete { .. } => {
                map.shift_remove(last.as_str()).ok_or_else(not_found)?;
            }
        },
        Value::Array(items) => {
            let index = pointer::parse_index(&last).ok_or_else(not_found)?;
            match edit {
                Edit::Insert { value, .. } if index <= items.len() => items.insert(index, value.clone()),
                Edit::Update { value, .. } if index < items.len() => items[index] = value.clone(),
                Edit::Delete { .. } if index < items.len() => {
                    items.remove(index);
                }
                _ => return Err(not_found()),
            }
        }
        _ => return Err(PatchError::NotContainer { path: path.to_string() }),
    }
    Ok(())
}
