//! RSA manifest signature verification.
//!
//! Publishers sign the UTF-8 bytes of the manifest fingerprint with
//! RSASSA-PKCS1-v1_5 over SHA-256. The verifying key is an X.509
//! SubjectPublicKeyInfo, base64 encoded, supplied by the host.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use tracing::{debug, warn};

use kiln_types::Manifest;

use crate::error::RuntimeError;
use crate::fingerprint;

/// Detail reported when the manifest carries no signature.
pub const SIGNATURE_MISSING: &str = "signature missing";
/// Detail reported when the supplied key cannot be decoded.
pub const INVALID_PUBLIC_KEY: &str = "invalid public key";
/// Detail reported for any other verification failure.
pub const VERIFICATION_FAILED: &str = "verification failed";
/// Detail reported when no key is supplied and unsigned loading is off.
pub const UNSIGNED_REFUSED: &str =
    "no public key supplied and unsigned manifests are not allowed";

/// Verifies the manifest signature against `public_key_base64`.
///
/// Uses the publisher's `fingerprint` when present, otherwise recomputes it.
///
/// # Errors
///
/// Returns `RuntimeError::Signature` when the signature is missing, the key
/// or signature cannot be decoded, or verification fails.
#[tracing::instrument(skip_all, fields(id = %manifest.id, version = %manifest.version))]
pub fn verify_manifest(manifest: &Manifest, public_key_base64: &str) -> Result<(), RuntimeError> {
    let fail = |detail: &str| RuntimeError::Signature {
        id: manifest.id.clone(),
        version: manifest.version.clone(),
        detail: detail.to_string(),
    };

    let signature_b64 = manifest
        .signature_base64
        .as_deref()
        .ok_or_else(|| fail(SIGNATURE_MISSING))?;

    let fingerprint = match &manifest.fingerprint {
        Some(fp) => fp.clone(),
        None => {
            warn!("manifest carries no fingerprint, recomputing it locally");
            fingerprint::compute(manifest)
        }
    };

    let key_der = STANDARD
        .decode(public_key_base64.trim())
        .map_err(|_| fail(INVALID_PUBLIC_KEY))?;
    let public_key =
        RsaPublicKey::from_public_key_der(&key_der).map_err(|_| fail(INVALID_PUBLIC_KEY))?;
    let verifying = VerifyingKey::<Sha256>::new(public_key);

    let sig_bytes = STANDARD
        .decode(signature_b64.trim())
        .map_err(|_| fail(VERIFICATION_FAILED))?;
    let signature =
        Signature::try_from(sig_bytes.as_slice()).map_err(|_| fail(VERIFICATION_FAILED))?;

    verifying
        .verify(fingerprint.as_bytes(), &signature)
        .map_err(|_| fail(VERIFICATION_FAILED))?;
    debug!("signature verified");
    Ok(())
}
