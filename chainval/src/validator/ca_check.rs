//! Basic Constraints enforcement for issuing certificates

use crate::environment::ChainEnvironment;
use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::logging::DiagnosticOutput;
use crate::validator::cert::CertHandle;
use crate::validator::regtp::regtp_ca_info;
use crate::validator::settings::ValidationSettings;

/// `allowed_ca` checks whether `cert` meets the requirements for a CA,
/// i.e. carries a basicConstraints extension with the cA flag set. On
/// success the permitted chain length below this CA is returned, `-1`
/// meaning unbounded.
///
/// Certificates issued under the German signature law omit Basic
/// Constraints; [`regtp_ca_info`] recognises them and synthesises the chain
/// length.
pub fn allowed_ca(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    cert: &CertHandle,
    diag: &mut DiagnosticOutput<'_>,
) -> Result<i64> {
    if let Some(bc) = &cert.basic_constraints {
        if bc.ca {
            return Ok(bc.path_len.map(i64::from).unwrap_or(-1));
        }
    }

    if let Some(chain_len) = regtp_ca_info(env, settings, cert) {
        return Ok(i64::from(chain_len));
    }

    diag.emit(true, "issuer certificate is not marked as a CA");
    Err(Error::Validation(ChainValidationStatus::BadCertificate))
}
