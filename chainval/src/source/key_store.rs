//! In-memory key store and the search cursor used during issuer resolution
//!
//! [`MemoryKeyStore`] is a manually populated certificate store with two
//! overlays: the regular certificates and an ephemeral overlay for
//! certificates fetched from external services during a validation pass.
//! Clones share their contents, so a caller can keep a handle for
//! inspection while the validator owns another.
//!
//! [`KeyStoreCursor`] provides the stateful search discipline the issuer
//! resolver relies on: a position that advances across `search_*` calls
//! until reset, and a sticky ephemeral flag that must be saved, set and
//! restored around each probe of the other overlay.

use std::sync::{Arc, Mutex};

use crate::environment::chain_environment_traits::{CertValidity, KeyStore};
use crate::util::error::{Error, Result};
use crate::validator::cert::{CertHandle, CertProfile};

struct StoredCert {
    cert: CertHandle,
    ephemeral: bool,
    validity: CertValidity,
}

/// A manually populated in-memory certificate store.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    entries: Arc<Mutex<Vec<StoredCert>>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a certificate to the store.
    pub fn add_cert(&self, cert: CertHandle, ephemeral: bool) {
        let _ = self.store_cert(cert, ephemeral);
    }

    /// Returns the cached validity verdict recorded for `cert`.
    pub fn validity_of(&self, cert: &CertProfile) -> CertValidity {
        match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .find(|e| e.cert.encoded_cert == cert.encoded_cert)
                .map(|e| e.validity)
                .unwrap_or_default(),
            Err(_) => CertValidity::Unknown,
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn next_by_subject(&self, subject_dn: &str, start: usize, ephemeral: bool) -> Option<usize> {
        let entries = self.entries.lock().ok()?;
        entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, e)| e.ephemeral == ephemeral && e.cert.subject == subject_dn)
            .map(|(i, _)| i)
    }

    fn next_by_issuer_serial(
        &self,
        issuer_dn: &str,
        serial: &[u8],
        start: usize,
        ephemeral: bool,
    ) -> Option<usize> {
        let entries = self.entries.lock().ok()?;
        entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, e)| {
                e.ephemeral == ephemeral
                    && e.cert.issuer == issuer_dn
                    && e.cert.serial == serial
            })
            .map(|(i, _)| i)
    }

    fn cert_at(&self, index: usize) -> Option<CertHandle> {
        let entries = self.entries.lock().ok()?;
        entries.get(index).map(|e| e.cert.clone())
    }

    fn store_cert(&self, cert: CertHandle, ephemeral: bool) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::Unrecognized)?;
        if entries
            .iter()
            .any(|e| e.cert.encoded_cert == cert.encoded_cert && e.ephemeral == ephemeral)
        {
            return Ok(());
        }
        entries.push(StoredCert {
            cert,
            ephemeral,
            validity: CertValidity::Unknown,
        });
        Ok(())
    }

    fn set_validity(&self, cert: &CertProfile, validity: CertValidity) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::Unrecognized)?;
        let mut found = false;
        for e in entries.iter_mut() {
            if e.cert.encoded_cert == cert.encoded_cert {
                e.validity = validity;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }
}

/// A search cursor over a [`KeyStore`], one per validation pass.
///
/// The cursor remembers the position after the last hit, so repeated
/// `search_*` calls iterate over further candidates until
/// [`search_reset`](KeyStoreCursor::search_reset) is called. The ephemeral
/// flag is sticky and selects which overlay searches address.
pub struct KeyStoreCursor<'a> {
    store: &'a dyn KeyStore,
    next: usize,
    current: Option<usize>,
    ephemeral: bool,
}

impl<'a> KeyStoreCursor<'a> {
    /// Creates a cursor over `store` positioned at the start, with the
    /// ephemeral overlay deselected.
    pub fn new(store: &'a dyn KeyStore) -> Self {
        KeyStoreCursor {
            store,
            next: 0,
            current: None,
            ephemeral: false,
        }
    }

    /// Rewinds the search position.
    pub fn search_reset(&mut self) {
        self.next = 0;
        self.current = None;
    }

    /// Selects or deselects the ephemeral overlay, returning the previous
    /// selection.
    pub fn set_ephemeral(&mut self, on: bool) -> bool {
        core::mem::replace(&mut self.ephemeral, on)
    }

    /// Finds the next certificate whose subject DN equals `subject_dn`.
    pub fn search_subject(&mut self, subject_dn: &str) -> Result<()> {
        match self
            .store
            .next_by_subject(subject_dn, self.next, self.ephemeral)
        {
            Some(index) => {
                self.current = Some(index);
                self.next = index + 1;
                Ok(())
            }
            None => {
                self.current = None;
                Err(Error::NotFound)
            }
        }
    }

    /// Finds the next certificate matching the given issuer DN and serial
    /// number.
    pub fn search_issuer_serial(&mut self, issuer_dn: &str, serial: &[u8]) -> Result<()> {
        match self
            .store
            .next_by_issuer_serial(issuer_dn, serial, self.next, self.ephemeral)
        {
            Some(index) => {
                self.current = Some(index);
                self.next = index + 1;
                Ok(())
            }
            None => {
                self.current = None;
                Err(Error::NotFound)
            }
        }
    }

    /// Returns the certificate at the current search hit.
    pub fn get_cert(&self) -> Result<CertHandle> {
        let index = self.current.ok_or(Error::NotFound)?;
        self.store.cert_at(index).ok_or(Error::NotFound)
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &'a dyn KeyStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki::AlgorithmIdentifierOwned;
    use std::sync::Arc;

    fn cert(subject: &str, issuer: &str, serial: u8, tag: &str) -> CertHandle {
        Arc::new(CertProfile {
            encoded_cert: format!("cert:{}:{}", tag, serial).into_bytes(),
            subject: subject.to_string(),
            issuer: issuer.to_string(),
            serial: vec![serial],
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
        })
    }

    #[test]
    fn cursor_iterates_subject_matches() {
        let store = MemoryKeyStore::new();
        store.add_cert(cert("CN=CA", "CN=Root", 1, "a"), false);
        store.add_cert(cert("CN=Other", "CN=Root", 2, "b"), false);
        store.add_cert(cert("CN=CA", "CN=Root", 3, "c"), false);

        let mut cursor = KeyStoreCursor::new(&store);
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(vec![1], cursor.get_cert().unwrap().serial);
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(vec![3], cursor.get_cert().unwrap().serial);
        assert_eq!(Err(Error::NotFound), cursor.search_subject("CN=CA"));

        cursor.search_reset();
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(vec![1], cursor.get_cert().unwrap().serial);
    }

    #[test]
    fn ephemeral_overlay_is_separate() {
        let store = MemoryKeyStore::new();
        store.add_cert(cert("CN=CA", "CN=Root", 1, "perm"), false);
        store.add_cert(cert("CN=CA", "CN=Root", 2, "eph"), true);

        let mut cursor = KeyStoreCursor::new(&store);
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(vec![1], cursor.get_cert().unwrap().serial);
        assert_eq!(Err(Error::NotFound), cursor.search_subject("CN=CA"));

        let old = cursor.set_ephemeral(true);
        assert!(!old);
        cursor.search_reset();
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(vec![2], cursor.get_cert().unwrap().serial);
        cursor.set_ephemeral(old);
    }

    #[test]
    fn issuer_serial_search_and_validity_flags() {
        let store = MemoryKeyStore::new();
        let ca = cert("CN=CA", "CN=Root", 7, "x");
        store.add_cert(ca.clone(), false);

        let mut cursor = KeyStoreCursor::new(&store);
        cursor.search_issuer_serial("CN=Root", &[7]).unwrap();
        assert_eq!("CN=CA", cursor.get_cert().unwrap().subject);
        assert_eq!(
            Err(Error::NotFound),
            cursor.search_issuer_serial("CN=Root", &[8])
        );

        assert_eq!(CertValidity::Unknown, store.validity_of(&ca));
        store.set_validity(&ca, CertValidity::Revoked).unwrap();
        assert_eq!(CertValidity::Revoked, store.validity_of(&ca));
    }

    #[test]
    fn duplicate_store_is_a_noop() {
        let store = MemoryKeyStore::new();
        let ca = cert("CN=CA", "CN=Root", 1, "dup");
        store.add_cert(ca.clone(), false);
        store.add_cert(ca, false);

        let mut cursor = KeyStoreCursor::new(&store);
        cursor.search_subject("CN=CA").unwrap();
        assert_eq!(Err(Error::NotFound), cursor.search_subject("CN=CA"));
    }
}
