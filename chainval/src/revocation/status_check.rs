//! Certificate status checks against the directory service
//!
//! The directory daemon answers "is this certificate, as certified by that
//! issuer, still valid" using either CRLs or OCSP. Revocation, missing CRLs
//! and stale CRLs are soft failures here: they are accumulated and only
//! collapsed into a verdict once the whole chain has been walked. A
//! revoked verdict is additionally stamped onto the key store entry so
//! listings can show it without a fresh directory round trip.

use log::info;

use crate::environment::chain_environment_traits::CertValidity;
use crate::environment::ChainEnvironment;
use crate::util::error::{ChainValidationStatus, Result};
#[cfg(test)]
use crate::util::error::Error;
use crate::util::logging::DiagnosticOutput;
use crate::validator::cert::CertProfile;
use crate::validator::results::SoftFailures;
use crate::validator::settings::ValidationSettings;

/// `is_cert_still_valid` asks the directory service whether `subject`, as
/// certified by `issuer`, is currently valid.
///
/// Skipped entirely when CRL checking is disabled and OCSP was not
/// requested. Revoked / no-CRL / stale-CRL answers set the matching
/// accumulator in `soft` and return `Ok`; any other failure is returned to
/// the caller as fatal.
pub fn is_cert_still_valid(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    use_ocsp: bool,
    diag: &mut DiagnosticOutput<'_>,
    subject: &CertProfile,
    issuer: &CertProfile,
    soft: &mut SoftFailures,
) -> Result<()> {
    if settings.no_crl_check && !use_ocsp {
        return Ok(());
    }

    let err = match env.directory()?.is_valid(subject, issuer, use_ocsp) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !diag.list_mode() {
        info!(
            "checking status of certificate issued to {}",
            subject.subject
        );
    }
    match err.status() {
        ChainValidationStatus::CertificateRevoked => {
            diag.emit(true, "certificate has been revoked");
            soft.any_revoked = true;
            // Stamp the store entry so that listings can return the
            // revoked flag; failures here are not interesting.
            if let Ok(store) = env.key_store() {
                let _ = store.set_validity(subject, CertValidity::Revoked);
            }
            Ok(())
        }
        ChainValidationStatus::NoCrlKnown => {
            diag.emit(true, "no CRL found for certificate");
            soft.any_no_crl = true;
            Ok(())
        }
        ChainValidationStatus::CrlTooOld => {
            diag.emit(true, "the available CRL is too old");
            if !diag.list_mode() {
                info!("please make sure that the \"dirmngr\" is properly installed");
            }
            soft.any_crl_too_old = true;
            Ok(())
        }
        _ => {
            diag.emit(true, &format!("checking the CRL failed: {}", err));
            Err(err)
        }
    }
}
