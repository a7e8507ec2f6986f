//! Resource-level mask & reconstruct (§4.E): `maskResource` and
//! `reconstructOriginalFromMaskPaths`.

use serde_json::Value;

use crate::mask::{self, MaskArgs};
use crate::pointer;
use crate::transport::Connection;

/// Arguments to [`mask_resource`].
pub struct MaskResourceArgs<'a> {
    pub resource: &'a Value,
    /// `None` is caller error (not a thrown exception) per §4.E — the
    /// sentinel empty output is returned instead.
    pub url_to_resource: Option<String>,
    pub paths: &'a [String],
    pub nonce: Option<String>,
    pub nonceurl: Option<String>,
}

/// The result of [`mask_resource`]: the nonce/nonceurl actually used
/// (shared by every masked path) and the resulting resource, or all
/// `None` if `urlToResource` was absent.
pub struct MaskResourceOutput {
    pub nonce: Option<String>,
    pub nonceurl: Option<String>,
    pub resource: Option<Value>,
}

/// `maskResource({resource, urlToResource, paths, nonce?, nonceurl?}) -> {nonce, resource, nonceurl}` (§4.E).
///
/// Pure; does not mutate `resource`. Every path in `paths` is masked
/// under the same nonce/nonceurl.
pub fn mask_resource(args: MaskResourceArgs<'_>) -> MaskResourceOutput {
    let Some(url_to_resource) = args.url_to_resource else {
        return MaskResourceOutput {
            nonce: None,
            nonceurl: None,
            resource: None,
        };
    };

    let nonce = args.nonce.unwrap_or_else(mask::generate_nonce);
    let nonceurl = args
        .nonceurl
        .unwrap_or_else(|| format!("{url_to_resource}/_meta/nonce"));

    let mut out = args.resource.clone();
    for path in args.paths {
        let Some(subtree) = pointer::resolve(&out, path) else {
            continue;
        };
        let subtree = subtree.clone();
        let masked = mask::mask(MaskArgs {
            original: &subtree,
            url: format!("{url_to_resource}{path}"),
            nonce: Some(nonce.clone()),
            nonceurl: nonceurl.clone(),
        });
        // `nonceurl` is always non-empty here, so `mask` cannot fail.
        if let Ok(masked) = masked {
            pointer::set(&mut out, path, masked.mask);
        }
    }

    MaskResourceOutput {
        nonce: Some(nonce),
        nonceurl: Some(nonceurl),
        resource: Some(out),
    }
}

/// Result of reconstructing one or more masked paths back to their
/// originals.
#[derive(Debug, Clone)]
pub struct ReconstructResult {
    pub valid: bool,
    pub r#match: bool,
    pub details: Vec<String>,
    pub resource: Value,
}

/// `reconstructOriginalFromMaskPaths(maskedResource, paths, conn) -> {valid, match, details, resource}` (§4.E).
///
/// Per-path fetches run concurrently; write-back into the single
/// resource copy is serialized via a fold so writes never race, and is
/// order-independent because each path targets a disjoint subtree.
pub async fn reconstruct_original_from_mask_paths(
    masked_resource: &Value,
    paths: &[String],
    conn: &Connection,
) -> ReconstructResult {
    let fetches = paths.iter().map(|path| async move {
        let mask_value = pointer::resolve(masked_resource, path).cloned();
        let verdict = match &mask_value {
            Some(v) => crate::remote::verify_remote(v, conn).await,
            None => crate::remote::VerifyRemoteResult {
                valid: false,
                r#match: false,
                original: None,
                nonce: None,
                details: format!("no value at {path}"),
            },
        };
        (path.clone(), verdict)
    });
    let results = futures_join_all(fetches).await;

    let mut out = masked_resource.clone();
    let mut valid = true;
    let mut matched = true;
    let mut details = Vec::new();

    for (path, verdict) in results {
        valid &= verdict.valid;
        matched &= verdict.r#match;
        details.push(verdict.details.clone());
        // Write back the fetched original even on mismatch: downstream
        // chain verification still needs the structural reconstruction.
        if let Some(original) = verdict.original {
            pointer::set(&mut out, &path, original);
        }
    }

    ReconstructResult {
        valid,
        r#match: matched,
        details,
        resource: out,
    }
}

/// Small local `join_all` so this crate doesn't need the `futures` crate
/// just for one call site; `tokio::join!` can't take a runtime-sized
/// slice of futures, so we drive them with `FuturesUnordered`-free manual
/// polling via `tokio::task::JoinSet` instead.
async fn futures_join_all<F, T>(iter: impl IntoIterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut set = tokio::task::JoinSet::new();
    for fut in iter {
        set.spawn(fut);
    }
    let mut out = Vec::new();
    while let Some(res) = set.join_next().await {
        if let Ok(value) = res {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_resource_replaces_paths_and_shares_nonce() {
        let resource = serde_json::json!({
            "_id": "1",
            "location": {"here": "here"},
            "key1": "secret1",
        });
        let out = mask_resource(MaskResourceArgs {
            resource: &resource,
            url_to_resource: Some("https://example.com/resources/1".to_string()),
            paths: &["/location".to_string(), "/key1".to_string()],
            nonce: None,
            nonceurl: None,
        });
        let resource = out.resource.expect("url_to_resource was provided");
        assert!(mask::is_mask(&resource["location"]));
        assert!(mask::is_mask(&resource["key1"]));
        assert_eq!(resource["_id"], serde_json::json!("1"));
    }

    #[test]
    fn mask_resource_without_url_returns_sentinel() {
        let resource = serde_json::json!({"a": 1});
        let out = mask_resource(MaskResourceArgs {
            resource: &resource,
            url_to_resource: None,
            paths: &["/a".to_string()],
            nonce: None,
            nonceurl: None,
        });
        assert!(out.resource.is_none());
        assert!(out.nonce.is_none());
        assert!(out.nonceurl.is_none());
    }

    #[test]
    fn mask_resource_does_not_mutate_input() {
        let resource = serde_json::json!({"location": {"here": "here"}});
        let before = resource.clone();
        let _ = mask_resource(MaskResourceArgs {
            resource: &resource,
            url_to_resource: Some("https://example.com/resources/1".to_string()),
            paths: &["/location".to_string()],
            nonce: None,
            nonceurl: None,
        });
        assert_eq!(resource, before);
    }

    #[test]
    fn default_nonceurl_is_under_meta() {
        let resource = serde_json::json!({"a": 1});
        let out = mask_resource(MaskResourceArgs {
            resource: &resource,
            url_to_resource: Some("https://example.com/resources/1".to_string()),
            paths: &["/a".to_string()],
            nonce: None,
            nonceurl: None,
        });
        assert_eq!(
            out.nonceurl.expect("url_to_resource was provided"),
            "https://example.com/resources/1/_meta/nonce"
        );
    }

    #[test]
    fn found_paths_are_a_superset_of_requested_paths() {
        let resource = serde_json::json!({"a": 1, "b": 2});
        let out = mask_resource(MaskResourceArgs {
            resource: &resource,
            url_to_resource: Some("https://example.com/r/1".to_string()),
            paths: &["/a".to_string()],
            nonce: None,
            nonceurl: None,
        });
        let resource = out.resource.expect("url_to_resource was provided");
        let found = pointer::find_all_mask_paths(&resource, 128);
        assert!(found.contains(&"/a".to_string()));
    }
}
