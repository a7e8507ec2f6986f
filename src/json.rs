//! Deterministic JSON hashing: the `hashJSON` collaborator of §6 and the
//! hash commitment scheme of §4.B.
//!
//! Canonicalization sorts object keys recursively and renders a compact,
//! whitespace-free form; arrays keep their order (only objects get
//! key-sorted). This mirrors `govctl`'s `signature::canonicalize_json`,
//! generalized from "RFC/ADR/Work-Item documents" to "arbitrary JSON
//! values".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The output of the canonical hasher: `{alg, hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashInfo {
    pub alg: String,
    pub hash: String,
}

/// Canonicalize a JSON value into a deterministic string: object keys
/// sorted recursively, arrays preserve order, no extraneous whitespace.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(num) => out.push_str(&num.to_string()),
        Value::String(s) => {
            if let Ok(escaped) = serde_json::to_string(s) {
                out.push_str(&escaped);
            }
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if let Ok(escaped_key) = serde_json::to_string(*key) {
                    out.push_str(&escaped_key);
                }
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        hex.push_str(&format!("{b:02x}"));
    }
    hex
}

/// The deterministic canonical hasher used for mask commitments and, in
/// principle, anything else that needs a stable digest of a JSON value.
/// `alg` is always `"SHA256"`.
pub fn hash_json(value: &Value) -> HashInfo {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    HashInfo {
        alg: "SHA256".to_string(),
        hash: hex_encode(&hasher.finalize()),
    }
}

/// `commit(original, nonce) -> hashinfo`, per §4.B: the canonical,
/// non-legacy commitment wrapper. This MUST be used consistently by both
/// producer (`mask.rs::mask`) and verifier (`mask.rs::verify`) — never
/// the legacy `original._nonce` mutation form.
pub fn commit(original: &Value, nonce: &str) -> HashInfo {
    let wrapper = serde_json::json!({
        "original": original,
        "nonce": nonce,
    });
    hash_json(&wrapper)
}
