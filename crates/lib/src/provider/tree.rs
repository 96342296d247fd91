//! Navigation and mutation of in-memory value trees.
//!
//! Shared by every backend that keeps (part of) its data as a [`Value`]. The
//! traversal rules are the protocol's: only structures can be stepped into;
//! stepping into a collection is malformed, stepping into anything else finds nothing.

use crate::{
    Result,
    path::Path,
    provider::ProviderError,
    value::{Operation, Value},
};

fn step<'a>(node: &'a Value, element: &str, path: &Path) -> Result<&'a Value> {
    match node {
        Value::Structure(map) => map
            .get(element)
            .ok_or_else(|| ProviderError::not_found(path.to_string()).into()),
        Value::Collection(_) => {
            Err(ProviderError::malformed(path.to_string(), "collections are not indexable").into())
        }
        _ => Err(ProviderError::not_found(path.to_string()).into()),
    }
}

fn step_mut<'a>(node: &'a mut Value, element: &str, path: &Path) -> Result<&'a mut Value> {
    match node {
        Value::Structure(map) => map
            .get_mut(element)
            .ok_or_else(|| ProviderError::not_found(path.to_string()).into()),
        Value::Collection(_) => {
            Err(ProviderError::malformed(path.to_string(), "collections are not indexable").into())
        }
        _ => Err(ProviderError::not_found(path.to_string()).into()),
    }
}

/// Borrows the element at `path`.
pub(crate) fn lookup<'a>(root: &'a Value, path: &Path) -> Result<&'a Value> {
    path.elements()
        .iter()
        .try_fold(root, |node, element| step(node, element, path))
}

/// Mutably borrows the element at `path`.
pub(crate) fn lookup_mut<'a>(root: &'a mut Value, path: &Path) -> Result<&'a mut Value> {
    let mut node = root;
    for element in path.elements() {
        node = step_mut(node, element, path)?;
    }
    Ok(node)
}

/// Borrows the structure that will hold the last element of `path`.
fn parent_structure<'a>(
    root: &'a mut Value,
    path: &Path,
) -> Result<(&'a mut std::collections::BTreeMap<String, Value>, String)> {
    let (Some(parent), Some(last)) = (path.parent(), path.last()) else {
        return Err(ProviderError::malformed(path.to_string(), "the root has no parent").into());
    };
    let last = last.to_string();
    match lookup_mut(root, &parent) {
        Ok(Value::Structure(map)) => Ok((map, last)),
        Ok(Value::Collection(_)) => {
            Err(ProviderError::malformed(path.to_string(), "collections are not indexable").into())
        }
        Ok(other) => Err(ProviderError::malformed(
            path.to_string(),
            format!("parent is a {}, not a structure", other.type_name()),
        )
        .into()),
        Err(e) if e.is_not_found() => Err(ProviderError::not_found(path.to_string()).into()),
        Err(e) => Err(e),
    }
}

pub(crate) fn read(root: &Value, path: &Path) -> Result<Value> {
    lookup(root, path).cloned()
}

pub(crate) fn write(root: &mut Value, path: &Path, value: Value) -> Result<()> {
    if path.is_root() {
        *root = value;
        return Ok(());
    }
    let (parent, key) = parent_structure(root, path)?;
    parent.insert(key, value);
    Ok(())
}

pub(crate) fn create(root: &mut Value, path: &Path, value: Value) -> Result<()> {
    match lookup_mut(root, path) {
        Ok(Value::Collection(items)) => {
            items.push(value);
            return Ok(());
        }
        Ok(_) => return Err(ProviderError::already_exists(path.to_string()).into()),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }
    let (parent, key) = parent_structure(root, path)?;
    parent.insert(key, value);
    Ok(())
}

pub(crate) fn delete(root: &mut Value, path: &Path) -> Result<()> {
    if path.is_root() {
        return Err(ProviderError::malformed(path.to_string(), "the root cannot be deleted").into());
    }
    let (parent, key) = parent_structure(root, path)?;
    parent
        .remove(&key)
        .map(|_| ())
        .ok_or_else(|| ProviderError::not_found(path.to_string()).into())
}

pub(crate) fn delete_member(root: &mut Value, path: &Path, value: &Value) -> Result<()> {
    match lookup_mut(root, path)? {
        Value::Collection(items) => match items.iter().position(|item| item == value) {
            Some(idx) => {
                items.remove(idx);
                Ok(())
            }
            None => Err(ProviderError::not_found(path.to_string()).into()),
        },
        other => Err(ProviderError::malformed(
            path.to_string(),
            format!("expected a collection, found a {}", other.type_name()),
        )
        .into()),
    }
}

/// Returns a handle on the operation at `path` so it can run outside any lock.
pub(crate) fn operation(root: &Value, path: &Path) -> Result<Operation> {
    match lookup(root, path)? {
        Value::Operation(op) => Ok(op.clone()),
        other => Err(ProviderError::malformed(
            path.to_string(),
            format!("expected an operation, found a {}", other.type_name()),
        )
        .into()),
    }
}

/// Inserts `value` at `path`, creating intermediate structures as needed.
pub(crate) fn graft(root: &mut Value, path: &Path, value: Value) {
    let mut node = root;
    for element in path.elements() {
        if !matches!(node, Value::Structure(_)) {
            *node = Value::structure();
        }
        node = match node {
            Value::Structure(map) => map.entry(element.clone()).or_insert(Value::Null),
            _ => unreachable!("node was just made a structure"),
        };
    }
    *node = value;
}
