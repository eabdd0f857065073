//! In-memory trust anchor list
//!
//! [`TrustList`] implements [`TrustAgent`] over a fingerprint-keyed table
//! of trusted roots with per-root flags, plus a list of roots approved for
//! qualified signatures with their country codes. `mark_trusted` either
//! promotes the root into the table or reports that interactive marking is
//! unavailable, depending on how the list was configured.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::environment::chain_environment_traits::{TrustAgent, TrustAnchorFlags};
use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::validator::cert::CertProfile;

#[derive(Default)]
struct TrustListInner {
    trusted: BTreeMap<[u8; 20], TrustAnchorFlags>,
    qualified: BTreeMap<[u8; 20], String>,
}

/// A manually populated trust anchor list keyed by SHA-1 fingerprint.
#[derive(Default)]
pub struct TrustList {
    inner: Mutex<TrustListInner>,
    allow_mark_trusted: bool,
}

impl TrustList {
    /// Creates an empty list that rejects interactive trust promotion.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an empty list that accepts `mark_trusted` requests,
    /// promoting roots with default flags.
    pub fn with_mark_trusted_allowed() -> Self {
        TrustList {
            allow_mark_trusted: true,
            ..Default::default()
        }
    }

    /// Adds `root` to the trust anchor list with the given flags.
    pub fn add_trusted_root(&self, root: &CertProfile, flags: TrustAnchorFlags) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.trusted.insert(root.fingerprint(), flags);
        }
    }

    /// Adds `root` to the qualified-signature list under `country`.
    pub fn add_qualified_root(&self, root: &CertProfile, country: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.qualified.insert(root.fingerprint(), country.to_string());
        }
    }
}

impl TrustAgent for TrustList {
    fn is_trusted(&self, root: &CertProfile) -> Result<TrustAnchorFlags> {
        let inner = self.inner.lock().map_err(|_| Error::Unrecognized)?;
        match inner.trusted.get(&root.fingerprint()) {
            Some(flags) => Ok(*flags),
            None => Err(Error::Validation(ChainValidationStatus::NotTrusted)),
        }
    }

    fn mark_trusted(&self, root: &CertProfile) -> Result<()> {
        if !self.allow_mark_trusted {
            return Err(Error::NotSupported);
        }
        let mut inner = self.inner.lock().map_err(|_| Error::Unrecognized)?;
        inner
            .trusted
            .insert(root.fingerprint(), TrustAnchorFlags::default());
        Ok(())
    }

    fn qualified_list_entry(&self, root: &CertProfile) -> Result<String> {
        let inner = self.inner.lock().map_err(|_| Error::Unrecognized)?;
        match inner.qualified.get(&root.fingerprint()) {
            Some(country) => Ok(country.clone()),
            None => Err(Error::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki::AlgorithmIdentifierOwned;

    fn root(tag: &str) -> CertProfile {
        CertProfile {
            encoded_cert: format!("root:{}", tag).into_bytes(),
            subject: "CN=Root".to_string(),
            issuer: "CN=Root".to_string(),
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
    fn trust_and_flags() {
        let list = TrustList::new();
        let r = root("a");
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NotTrusted)),
            list.is_trusted(&r)
        );
        list.add_trusted_root(&r, TrustAnchorFlags { relax: true });
        assert!(list.is_trusted(&r).unwrap().relax);
    }

    #[test]
    fn mark_trusted_configurable() {
        let refusing = TrustList::new();
        let accepting = TrustList::with_mark_trusted_allowed();
        let r = root("b");
        assert_eq!(Err(Error::NotSupported), refusing.mark_trusted(&r));
        accepting.mark_trusted(&r).unwrap();
        assert!(!accepting.is_trusted(&r).unwrap().relax);
    }

    #[test]
    fn qualified_lookup() {
        let list = TrustList::new();
        let r = root("c");
        assert_eq!(Err(Error::NotFound), list.qualified_list_entry(&r));
        list.add_qualified_root(&r, "de");
        assert_eq!("de", list.qualified_list_entry(&r).unwrap());
    }
}
