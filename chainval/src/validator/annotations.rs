//! Per-certificate annotations surviving individual validation calls
//!
//! Validation derives a small number of facts per certificate that are
//! expensive to recompute: whether the chain roots in a qualified-signature
//! root, and whether a certificate is a RegTP CA with a synthesised chain
//! length. [`CertAnnotations`] keeps these in a typed side-map keyed by the
//! certificate's SHA-1 fingerprint, so parsed certificate objects stay
//! immutable. Writes are best effort; a lost annotation only costs a
//! recomputation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::validator::cert::CertProfile;

/// Cached outcome of the RegTP recognition for one certificate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegTpStatus {
    /// Checked before; the certificate is not a RegTP CA certificate
    NotRegTp,
    /// A RegTP CA certificate with the given permitted chain length
    CaWithChainLen(u8),
}

#[derive(Clone, Default)]
struct CertAnnotation {
    is_qualified: Option<bool>,
    regtp: Option<RegTpStatus>,
}

/// Typed per-certificate annotation store keyed by SHA-1 fingerprint.
#[derive(Default)]
pub struct CertAnnotations {
    inner: Mutex<BTreeMap<[u8; 20], CertAnnotation>>,
}

impl CertAnnotations {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the cached qualified-signature flag for `cert`, if any.
    pub fn qualified_flag(&self, cert: &CertProfile) -> Option<bool> {
        let guard = self.inner.lock().ok()?;
        guard.get(&cert.fingerprint()).and_then(|a| a.is_qualified)
    }

    /// Records the qualified-signature flag for `cert`.
    pub fn set_qualified_flag(&self, cert: &CertProfile, qualified: bool) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.entry(cert.fingerprint()).or_default().is_qualified = Some(qualified);
        }
    }

    /// Returns the cached RegTP status for `cert`, if any.
    pub fn regtp_status(&self, cert: &CertProfile) -> Option<RegTpStatus> {
        let guard = self.inner.lock().ok()?;
        guard.get(&cert.fingerprint()).and_then(|a| a.regtp)
    }

    /// Records the RegTP status for `cert`.
    pub fn set_regtp_status(&self, cert: &CertProfile, status: RegTpStatus) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.entry(cert.fingerprint()).or_default().regtp = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki::AlgorithmIdentifierOwned;

    fn dummy_cert(tag: &str) -> CertProfile {
        CertProfile {
            encoded_cert: tag.as_bytes().to_vec(),
            subject: "CN=Test".to_string(),
            issuer: "CN=Test".to_string(),
            serial: vec![1],
            not_before: None,
            not_after: None,
            extensions: vec![],
            aki: None,
            ski: None,
            basic_constraints: None,
            policies: None,
            spki: vec![],
            tbs: vec![],
            signature: vec![],
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: crate::ALG_SHA256_WITH_RSA_ENCRYPTION,
                parameters: None,
            },
        }
    }

    #[test]
    fn annotations_are_keyed_by_image() {
        let store = CertAnnotations::new();
        let a = dummy_cert("a");
        let b = dummy_cert("b");

        assert!(store.qualified_flag(&a).is_none());
        store.set_qualified_flag(&a, true);
        assert_eq!(Some(true), store.qualified_flag(&a));
        assert!(store.qualified_flag(&b).is_none());

        store.set_regtp_status(&b, RegTpStatus::NotRegTp);
        assert_eq!(Some(RegTpStatus::NotRegTp), store.regtp_status(&b));
        assert!(store.regtp_status(&a).is_none());

        store.set_regtp_status(&b, RegTpStatus::CaWithChainLen(1));
        assert_eq!(Some(RegTpStatus::CaWithChainLen(1)), store.regtp_status(&b));
        // the other annotation on b is untouched
        assert!(store.qualified_flag(&b).is_none());
    }
}
