//! The mask descriptor (§3, §4.A) and single-object mask/verify (§4.C,
//! pure half — the I/O half, `verifyRemote`, lives in `remote.rs`).

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::json::{HashInfo, commit};

/// Descriptor format version this crate produces and accepts.
pub const MASK_VERSION: &str = "1.0";

/// The inner `trellis-mask` descriptor (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskDescriptor {
    pub version: String,
    pub hashinfo: HashInfo,
    pub url: String,
    pub nonceurl: String,
}

/// A JSON value is a mask iff it (or its `trellis-mask` field) carries all
/// four descriptor fields with the right shape. Returns the parsed
/// descriptor when it does.
pub fn as_mask(value: &Value) -> Option<MaskDescriptor> {
    let candidate = value
        .as_object()
        .and_then(|o| o.get("trellis-mask"))
        .unwrap_or(value);
    serde_json::from_value(candidate.clone()).ok()
}

/// `isMask(value) -> bool` (§4.A).
pub fn is_mask(value: &Value) -> bool {
    as_mask(value).is_some()
}

/// `domainForMask(mask) -> scheme://host[:port]`, or `None` if the
/// descriptor's `url` is malformed.
pub fn domain_for_mask(mask: &MaskDescriptor) -> Option<String> {
    domain_from_url(&mask.url)
}

/// `domainFromURL`: parse a URL down to `scheme://host[:port]`.
pub fn domain_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let scheme = parsed.scheme();
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{scheme}://{host}:{port}")),
        None => Some(format!("{scheme}://{host}")),
    }
}

/// `nonce() -> base64url(32 random bytes)` (§4.B).
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Arguments to [`mask`].
pub struct MaskArgs<'a> {
    pub original: &'a Value,
    pub url: String,
    pub nonce: Option<String>,
    pub nonceurl: String,
}

/// The result of [`mask`]: the nonce actually used (generated if the
/// caller didn't supply one), the nonceurl, and the produced descriptor.
pub struct MaskOutput {
    pub nonce: String,
    pub nonceurl: String,
    pub mask: Value,
}

/// `mask({original, url, nonce?, nonceurl}) -> {nonce, nonceurl, mask}` (§4.C).
///
/// Pure; does not mutate `original`. Fails with [`Error::MissingNonceUrl`]
/// if `nonceurl` is empty.
pub fn mask(args: MaskArgs<'_>) -> Result<MaskOutput> {
    if args.nonceurl.trim().is_empty() {
        return Err(Error::MissingNonceUrl);
    }
    let nonce = args.nonce.unwrap_or_else(generate_nonce);
    let hashinfo = commit(args.original, &nonce);
    let descriptor = MaskDescriptor {
        version: MASK_VERSION.to_string(),
        hashinfo,
        url: args.url,
        nonceurl: args.nonceurl.clone(),
    };
    let mask_value = serde_json::json!({ "trellis-mask": descriptor });
    Ok(MaskOutput {
        nonce,
        nonceurl: args.nonceurl,
        mask: mask_value,
    })
}

/// Arguments to [`verify`].
pub struct VerifyArgs<'a> {
    pub mask: Option<&'a Value>,
    pub original: Option<&'a Value>,
    pub nonce: Option<&'a str>,
}

/// Verdict of a pure, in-memory mask verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub valid: bool,
    pub r#match: bool,
    pub details: String,
}

/// `verify({mask, original, nonce}) -> {valid, match, details}` (§4.C).
///
/// Pure; no I/O. `valid=false` whenever the inputs are structurally
/// insufficient to even attempt a comparison; `match` only means
/// something once `valid` is true.
pub fn verify(args: VerifyArgs<'_>) -> VerifyResult {
    let Some(mask_value) = args.mask else {
        return invalid("mask is absent");
    };
    let Some(descriptor) = as_mask(mask_value) else {
        return invalid("value is not a mask");
    };
    if descriptor.version != MASK_VERSION {
        return invalid(&format!("unsupported mask version: {}", descriptor.version));
    }
    let Some(original) = args.original else {
        return invalid("original is absent");
    };
    let Some(nonce) = args.nonce else {
        return invalid("nonce is absent");
    };

    let recomputed = commit(original, nonce);
    let matched = recomputed == descriptor.hashinfo;
    VerifyResult {
        valid: true,
        r#match: matched,
        details: if matched {
            "hash commitment matches".to_string()
        } else {
            "hash commitment mismatch".to_string()
        },
    }
}

fn invalid(details: &str) -> VerifyResult {
    VerifyResult {
        valid: false,
        r#match: false,
        details: details.to_string(),
    }
}
