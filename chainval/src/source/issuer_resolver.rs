//! Issuer certificate resolution
//!
//! [`find_up`] locates a candidate issuer certificate for a subject, trying
//! in order: the authorityKeyIdentifier's issuer-and-serial reference, the
//! authorityKeyIdentifier's bare key identifier matched against subject key
//! identifiers, an external directory lookup (when enabled), and finally a
//! plain subject DN search. Each strategy probes the regular store first
//! and then the ephemeral overlay. In `find_next` mode the ephemeral
//! retries and external lookups are skipped so the store cursor keeps its
//! position and subsequent calls iterate over further candidates.

use log::{error, info};

use crate::environment::ChainEnvironment;
use crate::source::key_store::KeyStoreCursor;
use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::hexutil::buffer_to_hex;
use crate::validator::cert::{CertHandle, CertProfile};
use crate::validator::settings::ValidationSettings;

fn is_not_found(rc: &Result<()>) -> bool {
    matches!(rc, Err(Error::NotFound))
}

/// Helper for [`find_up`]. Resets the cursor and scans all certificates
/// whose subject equals `issuer_dn` for one carrying the given subject key
/// identifier.
fn find_up_search_by_keyid(
    cursor: &mut KeyStoreCursor<'_>,
    issuer_dn: &str,
    keyid: &[u8],
) -> Result<()> {
    cursor.search_reset();
    loop {
        cursor.search_subject(issuer_dn)?;
        let cert = match cursor.get_cert() {
            Ok(cert) => cert,
            Err(e) => {
                error!("reading certificate at cursor failed: {}", e);
                return Err(Error::NotFound);
            }
        };
        if cert.ski.as_deref() == Some(keyid) {
            return Ok(()); // found matching cert
        }
    }
}

/// Helper for [`find_up`]. Locates the certificate for `issuer_dn` using an
/// external directory lookup, storing every returned certificate in the
/// ephemeral overlay, then repeats the local search against that overlay.
fn find_up_external(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    cursor: &mut KeyStoreCursor<'_>,
    issuer_dn: &str,
    keyid: Option<&[u8]>,
) -> Result<()> {
    if settings.verbose {
        info!("looking up issuer at external location");
    }

    // The directory service is confused by unknown attributes, so search
    // from the CN on when the DN carries one.
    let s = issuer_dn
        .find(",CN=")
        .map(|i| &issuer_dn[i + 1..])
        .unwrap_or(issuer_dn);
    let pattern = format!("/{}", s);

    let directory = match env.directory() {
        Ok(d) => d,
        Err(e) => {
            error!("external key lookup failed: {}", e);
            return Err(Error::NotFound);
        }
    };

    let store = cursor.store();
    let count = match directory.lookup(&pattern, &mut |cert: CertHandle| {
        if store.store_cert(cert, true).is_err() {
            error!("error storing issuer certificate as ephemeral");
        }
    }) {
        Ok(count) => count,
        Err(e) => {
            error!("external key lookup failed: {}", e);
            return Err(Error::NotFound);
        }
    };

    if settings.verbose {
        info!("number of issuers matching: {}", count);
    }
    if count == 0 {
        return Err(Error::NotFound);
    }

    // the issuers are now in the ephemeral overlay, so search there
    let old = cursor.set_ephemeral(true);
    let rc = match keyid {
        Some(keyid) => find_up_search_by_keyid(cursor, issuer_dn, keyid),
        None => {
            cursor.search_reset();
            cursor.search_subject(issuer_dn)
        }
    };
    cursor.set_ephemeral(old);
    rc
}

/// Locates an issuing certificate for `subject`. `issuer_dn` is the issuer
/// name used as a fallback when the authorityKeyIdentifier strategies do
/// not apply. With `find_next` set the function returns the next possible
/// issuer instead of the first. The certificate itself is retrieved from
/// the cursor via [`KeyStoreCursor::get_cert`]. Returns
/// [`Error::NotFound`] when no candidate exists.
pub fn find_up(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    cursor: &mut KeyStoreCursor<'_>,
    subject: &CertProfile,
    issuer_dn: &str,
    find_next: bool,
) -> Result<()> {
    let mut rc: Result<()> = Err(Error::NotFound);

    if let Some(aki) = &subject.aki {
        if let (Some(aki_issuer), Some(serial)) = (&aki.issuer, &aki.serial) {
            rc = cursor.search_issuer_serial(aki_issuer, serial);
            if rc.is_err() {
                cursor.search_reset();
            }

            // On a miss try the ephemeral overlay. Not possible in
            // find_next mode because the search state could not be kept.
            if is_not_found(&rc) && !find_next {
                let old = cursor.set_ephemeral(true);
                if !old {
                    rc = cursor.search_issuer_serial(aki_issuer, serial);
                    if rc.is_err() {
                        cursor.search_reset();
                    }
                }
                cursor.set_ephemeral(old);
            }
        }

        if is_not_found(&rc) && !find_next {
            if let Some(keyid) = &aki.key_id {
                // Not found via issuer and serial number; loop over all
                // certificates with the issuer DN as subject and stop at
                // the one with a matching subjectKeyIdentifier.
                rc = find_up_search_by_keyid(cursor, issuer_dn, keyid);
                if rc.is_err() {
                    let old = cursor.set_ephemeral(true);
                    if !old {
                        rc = find_up_search_by_keyid(cursor, issuer_dn, keyid);
                    }
                    cursor.set_ephemeral(old);
                }
                if rc.is_err() {
                    rc = Err(Error::NotFound);
                }
            }
        }

        // still nothing; try an external lookup
        if is_not_found(&rc) && settings.auto_issuer_key_retrieve && !find_next {
            rc = find_up_external(env, settings, cursor, issuer_dn, aki.key_id.as_deref());
        }

        // A note so that the user does not feel too helpless when an issuer
        // certificate is later found but its signature does not verify.
        if is_not_found(&rc) {
            let mut msg = String::new();
            if find_next {
                msg.push_str("next ");
            }
            msg.push_str("issuer certificate ");
            if let Some(keyid) = &aki.key_id {
                msg.push_str(&format!("{{{}}} ", buffer_to_hex(keyid)));
            }
            if let (Some(aki_issuer), Some(serial)) = (&aki.issuer, &aki.serial) {
                msg.push_str(&format!("(#{}/{}) ", buffer_to_hex(serial), aki_issuer));
            }
            msg.push_str("not found using authorityKeyIdentifier");
            info!("{}", msg);
        } else if rc.is_err() {
            error!("failed to find authorityKeyIdentifier");
        }
    }

    if rc.is_err() {
        // not found via authorityKeyIdentifier, try the regular issuer name
        rc = cursor.search_subject(issuer_dn);
    }
    if is_not_found(&rc) && !find_next {
        // not found; see whether the ephemeral overlay has one
        let old = cursor.set_ephemeral(true);
        if !old {
            cursor.search_reset();
            rc = cursor.search_subject(issuer_dn);
        }
        cursor.set_ephemeral(old);
    }

    // still not found; if enabled, try an external lookup
    if is_not_found(&rc) && settings.auto_issuer_key_retrieve && !find_next {
        rc = find_up_external(env, settings, cursor, issuer_dn, None);
    }

    rc
}

/// Returns the certificate one step up in the chain starting at `start`,
/// or `Ok(None)` when `start` is a root.
///
/// This is a plain issuer lookup with no CA or signature checks; the RegTP
/// recognition uses it to ascend without re-entering the constraint
/// machinery.
pub fn next_in_chain(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    start: &CertProfile,
) -> Result<Option<CertHandle>> {
    if start.issuer.is_empty() {
        error!("no issuer found in certificate");
        return Err(Error::Validation(ChainValidationStatus::BadCertificate));
    }
    if start.subject.is_empty() {
        error!("no subject found in certificate");
        return Err(Error::Validation(ChainValidationStatus::BadCertificate));
    }
    if start.is_root() {
        return Ok(None);
    }

    let store = env.key_store()?;
    let mut cursor = KeyStoreCursor::new(store);
    match find_up(env, settings, &mut cursor, start, &start.issuer, false) {
        Ok(()) => {}
        Err(Error::NotFound) => {
            // it is quite common not to have the certificate, so no error
            return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
        }
        Err(e) => {
            if settings.verbose {
                error!("failed to find issuer's certificate: {}", e);
            }
            return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
        }
    }

    match cursor.get_cert() {
        Ok(cert) => Ok(Some(cert)),
        Err(e) => {
            error!("reading certificate at cursor failed: {}", e);
            Err(Error::Validation(ChainValidationStatus::General))
        }
    }
}
