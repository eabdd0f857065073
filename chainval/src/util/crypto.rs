//! Default signature verification backed by the RustCrypto project
//!
//! [`verify_signature_rust_crypto`] implements the [`VerifySignature`]
//! callback used by [`ChainEnvironment`]; RSA PKCS#1 v1.5 with the SHA-2
//! family and ECDSA over P-256/P-384 are supported. Callers with other
//! algorithm needs register additional callbacks on the environment.

use der::asn1::ObjectIdentifier;
use der::{AnyRef, Decode};
use ecdsa::signature::hazmat::PrehashVerifier;
use log::{debug, error};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::environment::ChainEnvironment;
use crate::util::alg_oids::*;
use crate::util::error::{ChainValidationStatus, Error, Result};

/// Returns the PKCS#1 v1.5 padding scheme matching an RSA signature algorithm.
fn rsa_padding_scheme(signature_alg: &AlgorithmIdentifierOwned) -> Result<Pkcs1v15Sign> {
    match signature_alg.oid {
        ALG_SHA224_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha224>()),
        ALG_SHA256_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha256>()),
        ALG_SHA384_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha384>()),
        ALG_SHA512_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha512>()),
        _ => Err(Error::Unrecognized),
    }
}

fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == ALG_SHA224_WITH_RSA_ENCRYPTION
        || *oid == ALG_SHA256_WITH_RSA_ENCRYPTION
        || *oid == ALG_SHA384_WITH_RSA_ENCRYPTION
        || *oid == ALG_SHA512_WITH_RSA_ENCRYPTION
}

fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == ALG_ECDSA_WITH_SHA256 || *oid == ALG_ECDSA_WITH_SHA384
}

fn rsa_message_digest(
    signature_alg: &AlgorithmIdentifierOwned,
    message: &[u8],
) -> Result<Vec<u8>> {
    match signature_alg.oid {
        ALG_SHA224_WITH_RSA_ENCRYPTION => Ok(Sha224::digest(message).to_vec()),
        ALG_SHA256_WITH_RSA_ENCRYPTION => Ok(Sha256::digest(message).to_vec()),
        ALG_SHA384_WITH_RSA_ENCRYPTION => Ok(Sha384::digest(message).to_vec()),
        ALG_SHA512_WITH_RSA_ENCRYPTION => Ok(Sha512::digest(message).to_vec()),
        _ => Err(Error::Unrecognized),
    }
}

fn named_curve_parameter(spki: &SubjectPublicKeyInfoOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &spki.algorithm.parameters {
        let ar: AnyRef<'_> = params.into();
        if let Ok(oid) = ObjectIdentifier::try_from(ar) {
            return Ok(oid);
        }
    }
    Err(Error::Validation(ChainValidationStatus::BadCertificate))
}

/// Verifies a certificate signature using RustCrypto implementations.
///
/// The public key is presented as a DER-encoded SubjectPublicKeyInfo, the
/// message is the raw TBSCertificate field. Returns
/// `Error::Validation(BadSignature)` when the signature does not verify and
/// `Error::Unrecognized` for algorithms this callback does not handle, so
/// that the environment can consult further callbacks.
pub fn verify_signature_rust_crypto(
    _env: &ChainEnvironment,
    message: &[u8],
    signature: &[u8],
    signature_alg: &AlgorithmIdentifierOwned,
    spki_der: &[u8],
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let rsa = RsaPublicKey::from_public_key_der(spki_der).map_err(|e| {
            error!("could not decode RSA public key: {}", e);
            Error::Validation(ChainValidationStatus::BadCertificate)
        })?;
        let digest = rsa_message_digest(signature_alg, message)?;
        let padding = rsa_padding_scheme(signature_alg)?;
        return rsa
            .verify(padding, digest.as_slice(), signature)
            .map_err(|_err| Error::Validation(ChainValidationStatus::BadSignature));
    }

    if is_ecdsa(&signature_alg.oid) {
        let spki = SubjectPublicKeyInfoOwned::from_der(spki_der).map_err(|e| {
            error!("could not decode SubjectPublicKeyInfo: {}", e);
            Error::Validation(ChainValidationStatus::BadCertificate)
        })?;
        let named_curve = named_curve_parameter(&spki)?;
        let digest = match signature_alg.oid {
            ALG_ECDSA_WITH_SHA256 => Sha256::digest(message).to_vec(),
            ALG_ECDSA_WITH_SHA384 => Sha384::digest(message).to_vec(),
            _ => return Err(Error::Unrecognized),
        };
        let point = spki.subject_public_key.raw_bytes();
        return match named_curve {
            CURVE_SECP256R1 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(|_err| {
                    error!("could not decode P-256 verifying key");
                    Error::Validation(ChainValidationStatus::BadCertificate)
                })?;
                let sig = p256::ecdsa::Signature::from_der(signature).map_err(|_err| {
                    Error::Validation(ChainValidationStatus::BadSignature)
                })?;
                key.verify_prehash(&digest, &sig)
                    .map_err(|_err| Error::Validation(ChainValidationStatus::BadSignature))
            }
            CURVE_SECP384R1 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(|_err| {
                    error!("could not decode P-384 verifying key");
                    Error::Validation(ChainValidationStatus::BadCertificate)
                })?;
                let sig = p384::ecdsa::Signature::from_der(signature).map_err(|_err| {
                    Error::Validation(ChainValidationStatus::BadSignature)
                })?;
                key.verify_prehash(&digest, &sig)
                    .map_err(|_err| Error::Validation(ChainValidationStatus::BadSignature))
            }
            _ => {
                error!("unrecognized or unsupported named curve: {}", named_curve);
                Err(Error::Unrecognized)
            }
        };
    }

    debug!("unrecognized signature algorithm: {}", signature_alg.oid);
    Err(Error::Unrecognized)
}
