//! The signature chain verifier (§4.G): `verifyRemoteResource` and the
//! recursive peel it's built on.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::pointer::find_all_mask_paths;
use crate::resource::reconstruct_original_from_mask_paths;
use crate::signer::{Signer, SignaturePayload};
use crate::transport::Connection;

/// The four independent verdict booleans of §4.G, plus the reconstructed
/// original and accumulated diagnostic detail.
#[derive(Debug, Clone)]
pub struct ChainVerdict {
    pub trusted: bool,
    pub valid: bool,
    pub unchanged: bool,
    pub r#match: bool,
    pub original: Value,
    pub details: Vec<String>,
}

fn has_signatures(doc: &Value) -> bool {
    doc.get("signatures")
        .map(|s| !matches!(s, Value::Null))
        .unwrap_or(false)
}

/// The base case (§4.G): "nothing attested". Deliberately
/// `unchanged:false, trusted:false` — not coerced to `true` (§9).
fn base_ok(doc: Value) -> ChainVerdict {
    ChainVerdict {
        trusted: false,
        valid: true,
        unchanged: false,
        r#match: true,
        original: doc,
        details: Vec::new(),
    }
}

fn fatal_invalid(resource: Value, reason: String) -> ChainVerdict {
    ChainVerdict {
        trusted: false,
        valid: false,
        unchanged: false,
        r#match: false,
        original: resource,
        details: vec![reason],
    }
}

/// `recursiveVerifyMaskSignatures`: peel the top-most signature off
/// `doc`, validate the masks it references, and recurse into whatever
/// signature remains underneath.
pub fn recursive_verify_mask_signatures<'a>(
    doc: Value,
    signer: &'a dyn Signer,
    conn: &'a Connection,
    max_depth: usize,
) -> Pin<Box<dyn Future<Output = ChainVerdict> + 'a>> {
    Box::pin(async move {
        if !has_signatures(&doc) {
            return base_ok(doc);
        }

        let sig = match signer.verify(&doc).await {
            Ok(sig) => sig,
            Err(e) => return fatal_invalid(doc, format!("signer error: {e}")),
        };

        if !sig.valid {
            return ChainVerdict {
                trusted: false,
                valid: false,
                unchanged: false,
                r#match: false,
                original: sig.original,
                details: sig.details,
            };
        }

        let rc = match &sig.payload {
            Some(SignaturePayload::Mask { mask_paths }) => {
                reconstruct_original_from_mask_paths(&sig.original, mask_paths, conn).await
            }
            Some(SignaturePayload::Modification) => {
                return fatal_invalid(
                    sig.original,
                    Error::ModificationUnsupported.to_string(),
                );
            }
            Some(SignaturePayload::Unknown) | None => crate::resource::ReconstructResult {
                valid: true,
                r#match: true,
                details: Vec::new(),
                resource: sig.original.clone(),
            },
        };

        let next = if has_signatures(&rc.resource) {
            recursive_verify_mask_signatures(rc.resource.clone(), signer, conn, max_depth).await
        } else {
            base_ok(rc.resource.clone())
        };

        let mut details = sig.details;
        details.extend(rc.details.clone());
        details.extend(next.details.clone());

        ChainVerdict {
            trusted: sig.trusted && next.trusted,
            unchanged: sig.unchanged && next.unchanged,
            valid: sig.valid && next.valid && rc.valid,
            r#match: next.r#match && rc.r#match,
            original: next.original,
            details,
        }
    })
}

/// `verifyRemoteResource({url, token?, connection?}) -> {trusted, unchanged, valid, match, original, details}` (§4.G).
///
/// Fetches the document at `url`, peels its signature chain, then runs
/// one final reconstruction pass over any mask descriptors still present
/// in the fully-unwound original (masks that were never covered by a
/// `mask`-type signature, e.g. because they predate signing).
#[instrument(skip(signer, conn), fields(url))]
pub async fn verify_remote_resource(
    url: &str,
    signer: &dyn Signer,
    conn: &Connection,
    max_depth: usize,
) -> Result<ChainVerdict> {
    let doc = conn.get(url).await.map_err(|source| {
        crate::error::wrap_transport_error(url, source, |url, source| {
            Error::OriginalFetchFailed { url, source }
        })
    })?;

    let verdict = recursive_verify_mask_signatures(doc, signer, conn, max_depth).await;

    let remaining_masks = find_all_mask_paths(&verdict.original, max_depth);
    if remaining_masks.is_empty() {
        info!(valid = verdict.valid, matched = verdict.r#match, "chain verified, no residual masks");
        return Ok(verdict);
    }

    let rc = reconstruct_original_from_mask_paths(&verdict.original, &remaining_masks, conn).await;
    let mut details = verdict.details;
    details.extend(rc.details);
    Ok(ChainVerdict {
        trusted: verdict.trusted,
        unchanged: verdict.unchanged,
        valid: verdict.valid && rc.valid,
        r#match: verdict.r#match && rc.r#match,
        original: rc.resource,
        details,
    })
}
