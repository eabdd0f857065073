//! ChainEnvironment aggregates the collaborators consulted while validating
//! a certificate chain: signature verification callbacks, the key store, the
//! directory client, the trust agent and the per-certificate annotations
//! store.
//!
//! The sample below illustrates preparation of a ChainEnvironment for
//! validating chains against an in-memory key store.
//! ```
//! use chainval::*;
//!
//! let mut env = ChainEnvironment::default();
//! // add the RustCrypto-backed signature verification callback
//! populate_chain_environment(&mut env);
//!
//! // wire the stores; MemoryKeyStore clones share their contents
//! env.set_key_store(Box::new(MemoryKeyStore::new()));
//! env.set_trust_agent(Box::new(TrustList::new()));
//! ```
//!
//! Keeping the collaborators behind trait objects allows support to vary:
//! one deployment may resolve issuers from a keybox file while another asks
//! a system store via FFI, without the validator changing.

use spki::AlgorithmIdentifierOwned;

use crate::environment::chain_environment_traits::*;
use crate::util::crypto::verify_signature_rust_crypto;
use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::validator::annotations::CertAnnotations;
use crate::validator::cert::CertProfile;

/// [`ChainEnvironment`] provides a switchboard of callback functions and
/// trait objects so that collaborator support can vary per platform or use
/// case.
#[derive(Default)]
pub struct ChainEnvironment {
    /// List of functions that provide signature verification
    verify_signature_callbacks: Vec<VerifySignature>,

    /// Store holding local and ephemeral certificates
    key_store: Option<Box<dyn KeyStore + Send + Sync>>,

    /// Client for the directory daemon (CRL/OCSP status, external lookup)
    directory: Option<Box<dyn DirectoryClient + Send + Sync>>,

    /// Agent owning the trust anchor and qualified-signature lists
    trust_agent: Option<Box<dyn TrustAgent + Send + Sync>>,

    /// Per-certificate annotations surviving individual validation calls
    annotations: CertAnnotations,
}

impl ChainEnvironment {
    /// Returns a new [`ChainEnvironment`] with no callbacks and no
    /// collaborators configured.
    pub fn new() -> ChainEnvironment {
        Default::default()
    }

    /// add_verify_signature_callback adds a [`VerifySignature`] callback to
    /// the list used by verify_signature.
    pub fn add_verify_signature_callback(&mut self, c: VerifySignature) {
        self.verify_signature_callbacks.push(c);
    }

    /// clear_verify_signature_callbacks clears the list of
    /// [`VerifySignature`] callbacks used by verify_signature.
    pub fn clear_verify_signature_callbacks(&mut self) {
        self.verify_signature_callbacks.clear();
    }

    /// verify_signature iterates over the registered callbacks until one
    /// produces an authoritative answer or all options have been exhausted.
    ///
    /// A callback that does not recognise the algorithm returns
    /// [`Error::Unrecognized`]; the most specific error seen is reported
    /// when no callback succeeds.
    pub fn verify_signature(
        &self,
        message: &[u8],
        signature: &[u8],
        signature_alg: &AlgorithmIdentifierOwned,
        spki: &[u8],
    ) -> Result<()> {
        let mut err = None;
        for f in &self.verify_signature_callbacks {
            match f(self, message, signature, signature_alg, spki) {
                Ok(()) => return Ok(()),
                Err(Error::Unrecognized) => {
                    if err.is_none() {
                        err = Some(Error::Unrecognized);
                    }
                }
                Err(e) => {
                    err = Some(e);
                }
            }
        }
        Err(err.unwrap_or(Error::Unrecognized))
    }

    /// Verifies the signature on `subject` using the public key of `issuer`.
    pub fn check_cert_signature(&self, issuer: &CertProfile, subject: &CertProfile) -> Result<()> {
        self.verify_signature(
            &subject.tbs,
            &subject.signature,
            &subject.signature_algorithm,
            &issuer.spki,
        )
    }

    /// Installs the key store.
    pub fn set_key_store(&mut self, store: Box<dyn KeyStore + Send + Sync>) {
        self.key_store = Some(store);
    }

    /// Returns the configured key store.
    pub fn key_store(&self) -> Result<&(dyn KeyStore + Send + Sync)> {
        match &self.key_store {
            Some(store) => Ok(store.as_ref()),
            None => Err(Error::Validation(ChainValidationStatus::Misconfiguration)),
        }
    }

    /// Installs the directory client.
    pub fn set_directory(&mut self, directory: Box<dyn DirectoryClient + Send + Sync>) {
        self.directory = Some(directory);
    }

    /// Returns the configured directory client.
    pub fn directory(&self) -> Result<&(dyn DirectoryClient + Send + Sync)> {
        match &self.directory {
            Some(directory) => Ok(directory.as_ref()),
            None => Err(Error::Validation(ChainValidationStatus::Misconfiguration)),
        }
    }

    /// Installs the trust agent.
    pub fn set_trust_agent(&mut self, agent: Box<dyn TrustAgent + Send + Sync>) {
        self.trust_agent = Some(agent);
    }

    /// Returns the configured trust agent.
    pub fn trust_agent(&self) -> Result<&(dyn TrustAgent + Send + Sync)> {
        match &self.trust_agent {
            Some(agent) => Ok(agent.as_ref()),
            None => Err(Error::Validation(ChainValidationStatus::Misconfiguration)),
        }
    }

    /// Returns the per-certificate annotations store.
    pub fn annotations(&self) -> &CertAnnotations {
        &self.annotations
    }
}

/// `populate_chain_environment` installs the default set of callbacks on a
/// [`ChainEnvironment`]:
///
/// - [`verify_signature_rust_crypto`]
///
/// Stores and agents are deployment specific and must be wired separately.
pub fn populate_chain_environment(env: &mut ChainEnvironment) {
    env.add_verify_signature_callback(verify_signature_rust_crypto);
}
