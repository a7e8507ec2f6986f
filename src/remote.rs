//! Remote-facing single-object verification (`verifyRemote`, the I/O half
//! of §4.C) and the remote masker (§4.F).

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::MaskLinkConfig;
use crate::error::{Error, Result};
use crate::mask::{self, VerifyArgs};
use crate::resource::{mask_resource, MaskResourceArgs};
use crate::signer::SignatureCallback;
use crate::transport::Connection;

/// Verdict of fetching a mask's sources and verifying the commitment
/// against them.
#[derive(Debug, Clone)]
pub struct VerifyRemoteResult {
    pub valid: bool,
    pub r#match: bool,
    pub original: Option<Value>,
    pub nonce: Option<String>,
    pub details: String,
}

/// `verifyRemote({mask, token?, connection?}) -> {valid, match, original, nonce, details}` (§4.C).
///
/// Fetches `mask.url` and `mask.nonceurl` concurrently. Any fetch failure
/// is recovered into `{valid:false, match:false}` rather than propagated,
/// per §7.
#[instrument(skip(mask_value, conn))]
pub async fn verify_remote(mask_value: &Value, conn: &Connection) -> VerifyRemoteResult {
    let Some(descriptor) = mask::as_mask(mask_value) else {
        return VerifyRemoteResult {
            valid: false,
            r#match: false,
            original: None,
            nonce: None,
            details: "value is not a mask".to_string(),
        };
    };

    let (original_res, nonce_res) =
        tokio::join!(conn.get(&descriptor.url), conn.get(&descriptor.nonceurl));

    let original = match original_res {
        Ok(v) => v,
        Err(e) => {
            warn!(url = %descriptor.url, error = %e, "original fetch failed");
            return VerifyRemoteResult {
                valid: false,
                r#match: false,
                original: None,
                nonce: None,
                details: format!("original fetch failed: {e}"),
            };
        }
    };

    let nonce_value = match nonce_res {
        Ok(v) => v,
        Err(e) => {
            warn!(url = %descriptor.nonceurl, error = %e, "nonce fetch failed");
            return VerifyRemoteResult {
                valid: false,
                r#match: false,
                original: Some(original),
                nonce: None,
                details: format!("nonce fetch failed: {e}"),
            };
        }
    };
    let Some(nonce) = nonce_value.as_str().map(str::to_string) else {
        return VerifyRemoteResult {
            valid: false,
            r#match: false,
            original: Some(original),
            nonce: None,
            details: "nonce value was not a JSON string".to_string(),
        };
    };

    let local = mask::verify(VerifyArgs {
        mask: Some(mask_value),
        original: Some(&original),
        nonce: Some(&nonce),
    });
    debug!(valid = local.valid, matched = local.r#match, "verify_remote resolved");
    VerifyRemoteResult {
        valid: local.valid,
        r#match: local.r#match,
        original: Some(original),
        nonce: Some(nonce),
        details: local.details,
    }
}

/// Arguments to [`mask_remote_resource_as_new_resource`].
pub struct MaskRemoteArgs<'a> {
    pub url: &'a str,
    pub paths: &'a [String],
    pub conn: &'a Connection,
    pub config: &'a MaskLinkConfig,
    pub signature_callback: Option<&'a dyn SignatureCallback>,
}

/// `maskRemoteResourceAsNewResource({url, paths, token?, connection?, signatureCallback?}) -> newResourceId` (§4.F).
#[instrument(skip(args), fields(url = %args.url))]
pub async fn mask_remote_resource_as_new_resource(args: MaskRemoteArgs<'_>) -> Result<String> {
    if args.url.trim().is_empty() {
        return Err(Error::InvalidArgument("url must not be empty"));
    }
    if args.paths.is_empty() {
        return Err(Error::InvalidArgument("paths must not be empty"));
    }

    // Step 2: fetch the original resource.
    let original = args
        .conn
        .get(args.url)
        .await
        .map_err(|source| {
            crate::error::wrap_transport_error(args.url, source, |url, source| {
                Error::OriginalFetchFailed { url, source }
            })
        })?;

    let resource_type = original
        .get("_type")
        .and_then(Value::as_str)
        .unwrap_or("application/json")
        .to_string();

    // Step 3: the nonce is write-once on the original; never overwritten
    // once present.
    let nonceurl = format!("{}/_meta/nonce", args.url);
    let nonce = match args.conn.get(&nonceurl).await {
        Ok(Value::String(existing)) => existing,
        Ok(_) | Err(_) => {
            let fresh = mask::generate_nonce();
            match args
                .conn
                .put(&nonceurl, &Value::String(fresh.clone()), &resource_type)
                .await
            {
                Ok(_) => fresh,
                Err(_) if args.config.retry_on_nonce_conflict => {
                    // Lost the write-once race; re-fetch the winner's nonce.
                    match args.conn.get(&nonceurl).await {
                        Ok(Value::String(winner)) => winner,
                        _ => fresh,
                    }
                }
                Err(source) => {
                    return Err(crate::error::wrap_transport_error(
                        &nonceurl,
                        source,
                        |url, source| Error::NoncePersistFailed { url, source },
                    ));
                }
            }
        }
    };

    // Step 4: compute the masked resource locally.
    let masked = mask_resource(MaskResourceArgs {
        resource: &original,
        url_to_resource: Some(args.url.to_string()),
        paths: args.paths,
        nonce: Some(nonce),
        nonceurl: Some(nonceurl),
    });
    let Some(mut resource) = masked.resource else {
        return Err(Error::InvalidArgument(
            "maskResource returned no resource (missing urlToResource)",
        ));
    };

    // Step 5: optional sign-back.
    if let Some(callback) = args.signature_callback {
        resource = callback
            .sign(resource)
            .await
            .map_err(Error::Signer)?;
    }

    // Step 6: persist the copy and extract the new id from content-location.
    let write = args.conn.post("/resources", &resource, &resource_type).await.map_err(
        |source| {
            if source.is_cancelled() {
                Error::Cancelled
            } else {
                Error::CopyPersistFailed { source }
            }
        },
    )?;
    let location = write
        .headers
        .get("content-location")
        .cloned()
        .ok_or_else(|| Error::InvalidArgument("POST response had no content-location header"))?;
    Ok(location.trim_start_matches('/').to_string())
}

/// `maskAndSignRemoteResourceAsNewResource(...) -> newResourceId`: the
/// same protocol with the sign-back step mandatory rather than optional.
pub async fn mask_and_sign_remote_resource_as_new_resource(
    url: &str,
    paths: &[String],
    conn: &Connection,
    config: &MaskLinkConfig,
    signer: &dyn SignatureCallback,
) -> Result<String> {
    mask_remote_resource_as_new_resource(MaskRemoteArgs {
        url,
        paths,
        conn,
        config,
        signature_callback: Some(signer),
    })
    .await
}

