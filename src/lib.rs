//! Mask & Link: selective redaction of JSON documents with cryptographic
//! commitments and a verifiable signature chain over masking history.
//!
//! See the module docs for the component breakdown: [`mask`] (descriptor
//! + pure mask/verify), [`pointer`] (JSON Pointer walker),
//! [`resource`] (resource-level mask/reconstruct), [`remote`]
//! (remote-facing mask + verify), [`signer`] (the external signer
//! contract this core consumes), [`chain`] (the signature chain
//! verifier), [`transport`] (the HTTP collaborator), [`config`]
//! (ambient tuning), [`json`] (canonical hashing), [`error`] (the error
//! taxonomy).

pub mod chain;
pub mod config;
pub mod error;
pub mod json;
pub mod mask;
pub mod pointer;
pub mod remote;
pub mod resource;
pub mod signer;
pub mod transport;

pub use chain::{verify_remote_resource, ChainVerdict};
pub use config::MaskLinkConfig;
pub use error::{Error, Result, TransportError};
pub use json::{commit, hash_json, HashInfo};
pub use mask::{domain_for_mask, generate_nonce, is_mask, mask, verify, MaskDescriptor};
pub use pointer::find_all_mask_paths;
pub use remote::{
    mask_and_sign_remote_resource_as_new_resource, mask_remote_resource_as_new_resource,
    verify_remote,
};
pub use resource::{mask_resource, reconstruct_original_from_mask_paths};
pub use signer::{sign_resource, KeyDeriver, Signer, SignaturePayload};
pub use transport::{resolve_connection, Connection, HttpTransport, Transport};
