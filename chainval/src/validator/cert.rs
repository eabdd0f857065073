//! Certificate projection used during chain processing
//!
//! [`CertProfile`] exposes exactly the certificate attributes the validator
//! consumes: the DN strings, the validity interval, the extension list, the
//! authority/subject key identifiers, the raw DER image and the pieces
//! needed to verify the signature. Instances are shared through
//! [`CertHandle`], the reference counted handle that crosses the boundary
//! between the validator and the stores.

use std::sync::Arc;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_KEY_USAGE, ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::asn1::{BitString, ObjectIdentifier};
use der::{Decode, Encode};
use flagset::FlagSet;
use log::error;
use sha1::{Digest, Sha1};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies, KeyUsage, KeyUsages,
    SubjectKeyIdentifier,
};
use x509_cert::Certificate;

use crate::util::error::{Error, Result};
use crate::util::hexutil::buffer_to_hex;
use crate::util::iso_time::IsoTime;

/// Reference counted certificate handle. The validator takes a reference on
/// entry and releases it on exit; stores hand out additional references.
pub type CertHandle = Arc<CertProfile>;

/// One certificate extension: OID, criticality and raw DER value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertExtension {
    /// Extension object identifier
    pub oid: ObjectIdentifier,
    /// Criticality flag
    pub critical: bool,
    /// Raw extnValue contents
    pub value: Vec<u8>,
}

/// Projection of the authorityKeyIdentifier extension.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthorityKeyId {
    /// The keyIdentifier field, when present
    pub key_id: Option<Vec<u8>>,
    /// The first directory name from authorityCertIssuer, when present
    pub issuer: Option<String>,
    /// The authorityCertSerialNumber field, when present
    pub serial: Option<Vec<u8>>,
}

/// Projection of the basicConstraints extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraintsInfo {
    /// The cA flag
    pub ca: bool,
    /// The pathLenConstraint field, when present
    pub path_len: Option<u8>,
}

/// Parsed projection of one certificate.
///
/// The `policies` field carries the certificatePolicies extension as a
/// newline separated list of `OID:N` / `OID:C` records, where the second
/// field reflects the criticality of the extension. Empty `subject` or
/// `issuer` strings represent absent names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertProfile {
    /// Raw DER image; the identity used for byte-wise comparison
    pub encoded_cert: Vec<u8>,
    /// Subject DN rendered as a string
    pub subject: String,
    /// Issuer DN rendered as a string
    pub issuer: String,
    /// Certificate serial number bytes
    pub serial: Vec<u8>,
    /// Start of the validity interval
    pub not_before: Option<IsoTime>,
    /// End of the validity interval
    pub not_after: Option<IsoTime>,
    /// All certificate extensions
    pub extensions: Vec<CertExtension>,
    /// authorityKeyIdentifier projection
    pub aki: Option<AuthorityKeyId>,
    /// subjectKeyIdentifier value
    pub ski: Option<Vec<u8>>,
    /// basicConstraints projection
    pub basic_constraints: Option<BasicConstraintsInfo>,
    /// certificatePolicies as line oriented `OID:N|C` records
    pub policies: Option<String>,
    /// Encoded SubjectPublicKeyInfo
    pub spki: Vec<u8>,
    /// Raw TBSCertificate bytes as signed
    pub tbs: Vec<u8>,
    /// Signature value bytes
    pub signature: Vec<u8>,
    /// Signature algorithm from the outer Certificate structure
    pub signature_algorithm: AlgorithmIdentifierOwned,
}

impl CertProfile {
    /// Returns true when issuer and subject DN are present and bytewise
    /// equal, i.e. the certificate is a root.
    pub fn is_root(&self) -> bool {
        !self.subject.is_empty() && self.subject == self.issuer
    }

    /// SHA-1 fingerprint over the DER image.
    pub fn fingerprint(&self) -> [u8; 20] {
        Sha1::digest(&self.encoded_cert).into()
    }

    /// SHA-1 fingerprint rendered as upper case hex.
    pub fn hex_fingerprint(&self) -> String {
        buffer_to_hex(&self.fingerprint())
    }

    /// Returns the parsed keyUsage bits, or None when the extension is
    /// absent or malformed.
    pub fn key_usage(&self) -> Option<FlagSet<KeyUsages>> {
        let ext = self.extensions.iter().find(|e| e.oid == ID_CE_KEY_USAGE)?;
        KeyUsage::from_der(&ext.value).ok().map(|ku| ku.0)
    }

    /// Returns true when the certificate may be used to sign other
    /// certificates. A certificate without a keyUsage extension is not
    /// restricted.
    pub fn may_sign_certificates(&self) -> bool {
        match self.key_usage() {
            Some(ku) => ku.contains(KeyUsages::KeyCertSign),
            None => true,
        }
    }
}

/// `SplitCertificate` parses only the top-level Certificate structure,
/// leaving the TBSCertificate field as raw bytes.
///
/// Verifying against the raw field avoids re-encoding the TBSCertificate
/// and thereby problems with structures that were not strictly DER encoded
/// prior to signing.
struct SplitCertificate {
    /// tbsCertificate       TBSCertificate,
    tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    signature: BitString,
}

impl ::der::FixedTag for SplitCertificate {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for SplitCertificate {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_certificate = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_certificate.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

fn policies_to_string(ext: &CertExtension) -> der::Result<String> {
    let cp = CertificatePolicies::from_der(&ext.value)?;
    let marker = if ext.critical { "C" } else { "N" };
    let lines: Vec<String> = cp
        .0
        .iter()
        .map(|p| format!("{}:{}", p.policy_identifier, marker))
        .collect();
    Ok(lines.join("\n"))
}

fn aki_projection(value: &[u8]) -> der::Result<AuthorityKeyId> {
    let aki = AuthorityKeyIdentifier::from_der(value)?;
    let issuer = aki.authority_cert_issuer.as_ref().and_then(|names| {
        names.iter().find_map(|gn| match gn {
            GeneralName::DirectoryName(name) => Some(name.to_string()),
            _ => None,
        })
    });
    Ok(AuthorityKeyId {
        key_id: aki.key_identifier.map(|ki| ki.as_bytes().to_vec()),
        issuer,
        serial: aki
            .authority_cert_serial_number
            .map(|sn| sn.as_bytes().to_vec()),
    })
}

impl TryFrom<&[u8]> for CertProfile {
    type Error = Error;

    fn try_from(enc_cert: &[u8]) -> Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        let split = SplitCertificate::from_der(enc_cert)?;
        let tbs = &cert.tbs_certificate;

        let mut extensions = Vec::new();
        if let Some(exts) = &tbs.extensions {
            for ext in exts {
                extensions.push(CertExtension {
                    oid: ext.extn_id,
                    critical: ext.critical,
                    value: ext.extn_value.as_bytes().to_vec(),
                });
            }
        }

        let mut aki = None;
        let mut ski = None;
        let mut basic_constraints = None;
        let mut policies = None;
        for ext in &extensions {
            match ext.oid {
                ID_CE_AUTHORITY_KEY_IDENTIFIER => aki = Some(aki_projection(&ext.value)?),
                ID_CE_SUBJECT_KEY_IDENTIFIER => {
                    let v = SubjectKeyIdentifier::from_der(&ext.value)?;
                    ski = Some(v.0.as_bytes().to_vec());
                }
                ID_CE_BASIC_CONSTRAINTS => {
                    let bc = BasicConstraints::from_der(&ext.value)?;
                    basic_constraints = Some(BasicConstraintsInfo {
                        ca: bc.ca,
                        path_len: bc.path_len_constraint,
                    });
                }
                ID_CE_CERTIFICATE_POLICIES => policies = Some(policies_to_string(ext)?),
                _ => {}
            }
        }

        Ok(CertProfile {
            encoded_cert: enc_cert.to_vec(),
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial: tbs.serial_number.as_bytes().to_vec(),
            not_before: Some(IsoTime(tbs.validity.not_before.to_date_time())),
            not_after: Some(IsoTime(tbs.validity.not_after.to_date_time())),
            extensions,
            aki,
            ski,
            basic_constraints,
            policies,
            spki: tbs.subject_public_key_info.to_der()?,
            tbs: split.tbs_field,
            signature: split.signature.raw_bytes().to_vec(),
            signature_algorithm: split.signature_algorithm,
        })
    }
}

/// `parse_cert` takes a buffer containing a binary DER encoded certificate
/// and a locator string for troubleshooting and returns a shared
/// [`CertHandle`] if parsing was successful.
pub fn parse_cert(buffer: &[u8], locator: &str) -> Result<CertHandle> {
    match CertProfile::try_from(buffer) {
        Ok(profile) => Ok(Arc::new(profile)),
        Err(e) => {
            error!("failed to parse certificate from {}: {}", locator, e);
            Err(e)
        }
    }
}
