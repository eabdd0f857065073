//! Trait and type definitions used by [`ChainEnvironment`] to reach the
//! external collaborators of the chain validator: the key store holding
//! certificates, the directory service answering revocation and lookup
//! queries, the agent managing the trust anchor list, and the signature
//! verification callbacks.

use spki::AlgorithmIdentifierOwned;

use crate::environment::ChainEnvironment;
use crate::util::error::Result;
use crate::validator::cert::{CertHandle, CertProfile};

/// `VerifySignature` provides a function signature for implementations that
/// verify a signature over a message, given the signature algorithm and a
/// DER-encoded SubjectPublicKeyInfo.
pub type VerifySignature = fn(
    &ChainEnvironment,
    &[u8],                     // message to hash and verify
    &[u8],                     // signature
    &AlgorithmIdentifierOwned, // signature algorithm
    &[u8],                     // public key (encoded SubjectPublicKeyInfo)
) -> Result<()>;

/// Cached validity verdict stored on a key store entry.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CertValidity {
    /// Nothing is known about the certificate's validity
    #[default]
    Unknown,
    /// The certificate is known to be revoked
    Revoked,
}

/// The [`KeyStore`] trait enables trait objects to provide access to stored
/// certificates backed via some means, i.e., in-memory, keybox file, system
/// store accessed via FFI, etc.
///
/// A store holds two overlays: the regular certificates and an ephemeral
/// overlay of certificates fetched from external services during a
/// validation pass. Searches address exactly one overlay, selected by the
/// `ephemeral` parameter, and resume from a caller maintained position so a
/// [`KeyStoreCursor`](crate::source::KeyStoreCursor) can iterate candidates.
pub trait KeyStore {
    /// Returns the index of the next certificate at or after `start` whose
    /// subject DN equals `subject_dn`, restricted to the given overlay.
    fn next_by_subject(&self, subject_dn: &str, start: usize, ephemeral: bool) -> Option<usize>;

    /// Returns the index of the next certificate at or after `start` whose
    /// issuer DN and serial number match, restricted to the given overlay.
    fn next_by_issuer_serial(
        &self,
        issuer_dn: &str,
        serial: &[u8],
        start: usize,
        ephemeral: bool,
    ) -> Option<usize>;

    /// Returns the certificate stored at `index`.
    fn cert_at(&self, index: usize) -> Option<CertHandle>;

    /// Stores a certificate, placing it in the ephemeral overlay when
    /// `ephemeral` is true. Storing an already present certificate is not an
    /// error.
    fn store_cert(&self, cert: CertHandle, ephemeral: bool) -> Result<()>;

    /// Records a cached validity verdict for the given certificate.
    fn set_validity(&self, cert: &CertProfile, validity: CertValidity) -> Result<()>;
}

/// The [`DirectoryClient`] trait is the boundary to the directory daemon
/// that answers certificate status queries (via CRL or OCSP) and performs
/// external certificate lookups.
pub trait DirectoryClient {
    /// Asks whether `subject`, as certified by `issuer`, is currently valid.
    ///
    /// Returns `Ok(())` when the certificate is valid,
    /// `Error::Validation(CertificateRevoked)` when revoked,
    /// `Error::Validation(NoCrlKnown)` when no CRL is available,
    /// `Error::Validation(CrlTooOld)` when only stale CRLs are available and
    /// any other error for operational failures.
    fn is_valid(&self, subject: &CertProfile, issuer: &CertProfile, use_ocsp: bool) -> Result<()>;

    /// Looks up certificates matching `pattern` and feeds each one to
    /// `sink`. Returns the number of certificates found.
    fn lookup(&self, pattern: &str, sink: &mut dyn FnMut(CertHandle)) -> Result<usize>;
}

/// Flags associated with a single trust anchor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TrustAnchorFlags {
    /// Allow relaxed checking of this root: skip the CRL check on the
    /// anchor itself and tolerate missing Basic Constraints.
    pub relax: bool,
}

/// The [`TrustAgent`] trait is the boundary to the agent that owns the
/// trust anchor list and the list of roots approved for qualified
/// signatures.
pub trait TrustAgent {
    /// Asks whether `root` is on the trust anchor list.
    ///
    /// Returns the anchor's flags when trusted,
    /// `Error::Validation(NotTrusted)` when the root is known but not
    /// trusted or simply absent, and any other error for operational
    /// failures.
    fn is_trusted(&self, root: &CertProfile) -> Result<TrustAnchorFlags>;

    /// Asks the agent to mark `root` as trusted, possibly interactively.
    ///
    /// `Error::NotSupported` indicates the agent cannot prompt at all;
    /// `Error::Canceled` indicates the user declined for this session.
    fn mark_trusted(&self, root: &CertProfile) -> Result<()>;

    /// Looks up `root` on the list of roots approved for qualified
    /// signatures, returning the associated two-letter country code, or
    /// `Error::NotFound` when the root is not listed.
    fn qualified_list_entry(&self, root: &CertProfile) -> Result<String>;
}
