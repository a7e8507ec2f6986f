//! JSON Pointer encode/decode and the mask walker (§4.D).

use serde_json::Value;

use crate::mask::is_mask;

/// Escape a single path segment per RFC 6901: `~` -> `~0`, `/` -> `~1`.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single path segment: `~1` -> `/`, `~0` -> `~` (order matters).
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Append a key to a pointer, escaping it.
pub fn push(pointer: &str, key: &str) -> String {
    format!("{pointer}/{}", escape_segment(key))
}

/// Split a JSON Pointer into its (unescaped) segments. `""` yields no segments.
pub fn segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .split('/')
        .skip(1)
        .map(unescape_segment)
        .collect()
}

/// Resolve a pointer against a tree, returning a reference to the subtree
/// if present.
pub fn resolve<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    let mut current = root;
    for seg in segments(pointer) {
        current = match current {
            Value::Object(map) => map.get(&seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a pointer against a tree, returning a mutable reference.
pub fn resolve_mut<'a>(root: &'a mut Value, pointer: &str) -> Option<&'a mut Value> {
    let mut current = root;
    for seg in segments(pointer) {
        current = match current {
            Value::Object(map) => map.get_mut(&seg)?,
            Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set the value at `pointer` in `root`, creating nothing — the pointer
/// must already resolve. Returns `false` if it doesn't.
pub fn set(root: &mut Value, pointer: &str, value: Value) -> bool {
    match resolve_mut(root, pointer) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Depth-first walk of `root` collecting the pointer of every mask
/// descriptor encountered. Masks are leaves: the walker never descends
/// into one. Non-object nodes (including arrays, by this spec's walker,
/// which only descends through object keys) contribute no paths.
///
/// `max_depth` bounds recursion (§9: "implementation-defined but >= 128");
/// exceeding it simply stops descending further down that branch rather
/// than failing the whole walk.
pub fn find_all_mask_paths(root: &Value, max_depth: usize) -> Vec<String> {
    let mut out = Vec::new();
    walk(root, String::new(), max_depth, &mut out);
    out
}

fn walk(node: &Value, pointer: String, depth_remaining: usize, out: &mut Vec<String>) {
    let Value::Object(map) = node else {
        return;
    };
    if is_mask(node) {
        out.push(pointer);
        return;
    }
    if depth_remaining == 0 {
        return;
    }
    for (key, child) in map {
        walk(child, push(&pointer, key), depth_remaining - 1, out);
    }
}
