//! Projection expressions: read only selected attributes of an item.
//!
//! Paths are dot-separated (`Owner.Name`) and joined with `,` on the wire.
//! Key attributes are always returned.

use crate::api::record::Record;
use crate::error::EncodingError;
use crate::types::{AttrValue, Item};

/// Every attribute path in `item`, descending into nested maps.
///
/// A nested map contributes its leaf paths (`Owner.Name`, `Owner.Age`); an
/// empty map contributes its own path.
pub fn paths_of(item: &Item) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(item, "", &mut paths);
    paths
}

fn collect_paths(item: &Item, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in item {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            AttrValue::M(nested) if !nested.is_empty() => collect_paths(nested, &path, out),
            _ => out.push(path),
        }
    }
}

/// The attribute paths of a record type, taken from its default value.
pub fn paths_for<R: Record + Default>() -> Result<Vec<String>, EncodingError> {
    Ok(paths_of(&crate::encoding::to_item(&R::default())?))
}

/// Join paths into a projection expression.
pub fn expression<S: AsRef<str>>(paths: &[S]) -> String {
    paths
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a projection expression back into paths.
pub fn parse(expression: &str) -> Vec<String> {
    expression
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve a dot-separated path inside an item.
pub fn resolve_path<'a>(item: &'a Item, path: &str) -> Option<&'a AttrValue> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = item.get(first)?;
    for segment in segments {
        current = current.as_m()?.get(segment)?;
    }
    Some(current)
}

/// Keep only `paths` (plus `key_attrs`) of `item`. An empty path list keeps
/// the whole item; paths that do not resolve are skipped.
pub fn apply_projection(item: &Item, paths: &[String], key_attrs: &[&str]) -> Item {
    if paths.is_empty() {
        return item.clone();
    }

    let mut result = Item::new();
    for &key in key_attrs {
        if let Some(v) = item.get(key) {
            result.insert(key.to_string(), v.clone());
        }
    }
    for path in paths {
        if let Some(v) = resolve_path(item, path) {
            set_nested_path(&mut result, path, v.clone());
        }
    }
    result
}

/// Set a value at a dot-separated path, creating intermediate maps.
fn set_nested_path(target: &mut Item, path: &str, value: AttrValue) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| AttrValue::M(Item::new()));
            if let AttrValue::M(nested) = entry {
                set_nested_path(nested, rest, value);
            }
        }
    }
}
