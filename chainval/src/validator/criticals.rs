//! Critical extension screening

use const_oid::db::rfc5912::{
    ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES, ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE,
};
use der::asn1::ObjectIdentifier;

use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::logging::DiagnosticOutput;
use crate::validator::cert::CertProfile;

/// Extensions the validator knows how to honor. Any critical extension
/// outside this list makes the certificate unusable. The list is data so
/// new entries need no matcher changes.
pub const KNOWN_CRITICAL_EXTENSIONS: &[ObjectIdentifier] = &[
    ID_CE_KEY_USAGE,
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_CERTIFICATE_POLICIES,
    ID_CE_EXT_KEY_USAGE,
];

/// `check_critical_extensions` affirms that every critical extension of
/// `cert` is on the [`KNOWN_CRITICAL_EXTENSIONS`] whitelist. All offending
/// extensions are reported before the error is returned.
pub fn check_critical_extensions(
    cert: &CertProfile,
    diag: &mut DiagnosticOutput<'_>,
) -> Result<()> {
    let mut rc = Ok(());
    for ext in &cert.extensions {
        if !ext.critical {
            continue;
        }
        if !KNOWN_CRITICAL_EXTENSIONS.contains(&ext.oid) {
            diag.emit(
                true,
                &format!(
                    "critical certificate extension {} is not supported",
                    ext.oid
                ),
            );
            rc = Err(Error::Validation(
                ChainValidationStatus::UnsupportedCertificate,
            ));
        }
    }
    rc
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki::AlgorithmIdentifierOwned;

    fn cert_with_ext(oid: &str, critical: bool) -> CertProfile {
        CertProfile {
            encoded_cert: vec![0x30],
            subject: "CN=Leaf".to_string(),
            issuer: "CN=Root".to_string(),
            serial: vec![1],
            not_before: None,
            not_after: None,
            extensions: vec![crate::CertExtension {
                oid: ObjectIdentifier::new_unwrap(oid),
                critical,
                value: vec![],
            }],
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
    fn known_criticals_pass() {
        let cert = cert_with_ext("2.5.29.19", true);
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_critical_extensions(&cert, &mut diag).is_ok());
    }

    #[test]
    fn unknown_critical_fails() {
        let cert = cert_with_ext("1.2.3.4", true);
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::Validation(
                ChainValidationStatus::UnsupportedCertificate
            )),
            check_critical_extensions(&cert, &mut diag)
        );
    }

    #[test]
    fn unknown_noncritical_is_fine() {
        let cert = cert_with_ext("1.2.3.4", false);
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_critical_extensions(&cert, &mut diag).is_ok());
    }
}
