//! The external signer contract (`tsig`-shaped, §6) and the signing
//! facade `signResource` (§4.H). The signer itself — key handling, the
//! on-wire JWS format — is explicitly out of scope (§1); only the shape
//! this crate consumes is defined here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A signature payload type. Only `Mask` is implemented end to end;
/// `Modification` is recognized but rejected (§4.G, §7
/// `ModificationUnsupported`), and anything else is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignaturePayload {
    Mask {
        #[serde(rename = "mask-paths")]
        mask_paths: Vec<String>,
    },
    Modification,
    #[serde(other)]
    Unknown,
}

/// What `externalSigner.verify(doc)` returns for the document's top-most
/// signature (§6).
#[derive(Debug, Clone)]
pub struct SignerVerifyOutcome {
    pub trusted: bool,
    pub unchanged: bool,
    pub valid: bool,
    /// The document as it existed at the moment this signature was
    /// applied (signature peeled off).
    pub original: Value,
    pub payload: Option<SignaturePayload>,
    pub details: Vec<String>,
}

/// The external signer/verifier collaborator. Implementations wrap
/// whatever JWS (or similar) library owns the on-wire format.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Append a signature over `doc`; does not mutate `doc`.
    async fn sign(
        &self,
        doc: &Value,
        header: &SignatureHeader,
        payload: Option<&SignaturePayload>,
    ) -> Result<Value, String>;

    /// Consume the top-most signature on `doc`.
    async fn verify(&self, doc: &Value) -> Result<SignerVerifyOutcome, String>;
}

/// The header accompanying a signature: signer identity material. Key
/// handling is out of scope; this is an opaque bag the signer consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jku: Option<String>,
}

/// The `keys.pubFromPriv`-shaped collaborator (§6): derives the public
/// identity material that goes into a signature header from a private
/// JWK. Key handling itself is out of scope (§1) — this trait is only
/// the shape `sign_resource` consumes.
pub trait KeyDeriver: Send + Sync {
    /// Derive `{jwk, kid, jku}` from a private JWK.
    fn derive_header(&self, private_jwk: &Value) -> SignatureHeader;
}

/// Arguments to [`sign_resource`].
pub struct SignResourceArgs<'a> {
    pub resource: &'a Value,
    /// The signer's private JWK. Required when `header` is absent, so
    /// the header's `jwk`/`kid`/`jku` can be derived from it.
    pub private_jwk: Option<&'a Value>,
    pub header: Option<SignatureHeader>,
    pub paths: Option<Vec<String>>,
    pub key_deriver: Option<&'a dyn KeyDeriver>,
    pub signer: &'a dyn Signer,
}

/// `signResource({resource, privateJWK, header?, signer?, paths?}) -> signedResource` (§4.H).
///
/// Derives `header.jwk/kid/jku` from `private_jwk` via `key_deriver` when
/// `header` is absent. Derives a `mask` payload (`{"mask-paths": paths}`)
/// when `paths` is given; otherwise signs with no payload (e.g. a
/// `transcription`-style attestation over the unmasked document, per §8
/// scenario 3). Does not mutate `resource`.
pub async fn sign_resource(args: SignResourceArgs<'_>) -> Result<Value, String> {
    let header = match args.header {
        Some(header) => header,
        None => match (args.private_jwk, args.key_deriver) {
            (Some(private_jwk), Some(deriver)) => deriver.derive_header(private_jwk),
            _ => SignatureHeader::default(),
        },
    };
    let payload = args.paths.map(|mask_paths| SignaturePayload::Mask { mask_paths });
    args.signer.sign(args.resource, &header, payload.as_ref()).await
}

/// The callback `maskRemoteResourceAsNewResource` may invoke after
/// masking locally and before persisting the copy (§4.F step 5).
#[async_trait]
pub trait SignatureCallback: Send + Sync {
    async fn sign(&self, resource: Value) -> Result<Value, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_payload_round_trips_through_json() {
        let payload = SignaturePayload::Mask {
            mask_paths: vec!["/location".to_string()],
        };
        let value = serde_json::to_value(&payload).expect("SignaturePayload serializes");
        assert_eq!(value["type"], serde_json::json!("mask"));
        assert_eq!(value["mask-paths"], serde_json::json!(["/location"]));
        let back: SignaturePayload =
            serde_json::from_value(value).expect("round-tripped value deserializes");
        assert_eq!(back, payload);
    }

    #[test]
    fn unknown_payload_type_is_recognized_not_rejected_at_parse_time() {
        let value = serde_json::json!({"type": "something-else"});
        let payload: SignaturePayload =
            serde_json::from_value(value).expect("unknown type falls back, not rejected");
        assert_eq!(payload, SignaturePayload::Unknown);
    }

    struct StubDeriver;
    impl KeyDeriver for StubDeriver {
        fn derive_header(&self, private_jwk: &Value) -> SignatureHeader {
            SignatureHeader {
                jwk: Some(serde_json::json!({"kty": private_jwk["kty"].clone()})),
                kid: private_jwk["kid"].as_str().map(str::to_string),
                jku: None,
            }
        }
    }

    struct EchoSigner;
    #[async_trait]
    impl Signer for EchoSigner {
        async fn sign(
            &self,
            doc: &Value,
            header: &SignatureHeader,
            _payload: Option<&SignaturePayload>,
        ) -> Result<Value, String> {
            let mut signed = doc.clone();
            signed["_last_header"] = serde_json::to_value(header).map_err(|e| e.to_string())?;
            Ok(signed)
        }

        async fn verify(&self, _doc: &Value) -> Result<SignerVerifyOutcome, String> {
            Err("not exercised by this test".to_string())
        }
    }

    #[tokio::test]
    async fn sign_resource_derives_header_from_private_jwk_when_absent() {
        let private_jwk = serde_json::json!({"kty": "EC", "kid": "key-1"});
        let resource = serde_json::json!({"_id": "1"});
        let signed = sign_resource(SignResourceArgs {
            resource: &resource,
            private_jwk: Some(&private_jwk),
            header: None,
            paths: None,
            key_deriver: Some(&StubDeriver),
            signer: &EchoSigner,
        })
        .await
        .expect("EchoSigner never fails");
        assert_eq!(signed["_last_header"]["kid"], serde_json::json!("key-1"));
        assert_eq!(signed["_last_header"]["jwk"]["kty"], serde_json::json!("EC"));
    }

    #[tokio::test]
    async fn sign_resource_uses_explicit_header_over_derivation() {
        let private_jwk = serde_json::json!({"kty": "EC", "kid": "key-1"});
        let resource = serde_json::json!({"_id": "1"});
        let explicit = SignatureHeader {
            jwk: None,
            kid: Some("explicit-kid".to_string()),
            jku: None,
        };
        let signed = sign_resource(SignResourceArgs {
            resource: &resource,
            private_jwk: Some(&private_jwk),
            header: Some(explicit),
            paths: None,
            key_deriver: Some(&StubDeriver),
            signer: &EchoSigner,
        })
        .await
        .expect("EchoSigner never fails");
        assert_eq!(signed["_last_header"]["kid"], serde_json::json!("explicit-kid"));
    }
}
