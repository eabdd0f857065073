//! The chain validation state machine
//!
//! [`validate_chain`] walks from the target certificate towards a root,
//! checking each node's validity window, critical extensions and policies,
//! resolving and verifying the issuer, enforcing CA constraints and path
//! lengths, and consulting the directory service for revocation status.
//! A self-signed certificate terminates the walk: it must be on the trust
//! anchor list, or the user may be asked to put it there. Soft failures
//! accumulate across the walk and collapse into the final verdict in
//! priority order.

use log::{error, info, warn};

use crate::environment::chain_environment_traits::TrustAnchorFlags;
use crate::environment::ChainEnvironment;
use crate::revocation::status_check::is_cert_still_valid;
use crate::source::issuer_resolver::find_up;
use crate::source::key_store::KeyStoreCursor;
use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::iso_time::IsoTime;
use crate::util::logging::DiagnosticOutput;
use crate::validator::ca_check::allowed_ca;
use crate::validator::cert::CertHandle;
use crate::validator::criticals::check_critical_extensions;
use crate::validator::policy::check_cert_policy;
use crate::validator::qualified::{classify_qualified_root, QualifiedState};
use crate::validator::request::{ValidationFlag, ValidationRequest, ValidationSession};
use crate::validator::results::{ChainValidationResults, SoftFailures};
use crate::validator::settings::ValidationSettings;

/// Maximum number of certificates below the root; longer chains fail.
pub const MAX_CHAIN_DEPTH: usize = 50;

// Bound on the alternative issuer certificates tried after a bad
// signature; guards against resolvers that keep yielding candidates.
const MAX_ISSUER_CANDIDATES: usize = 8;

/// Trust verdict for a root certificate, as far as it is known.
enum RootTrust {
    Trusted(TrustAnchorFlags),
    NotTrusted,
    Failed(Error),
}

fn query_root_trust(env: &ChainEnvironment, root: &CertHandle) -> RootTrust {
    match env.trust_agent().and_then(|agent| agent.is_trusted(root)) {
        Ok(flags) => RootTrust::Trusted(flags),
        Err(Error::Validation(ChainValidationStatus::NotTrusted)) => RootTrust::NotTrusted,
        Err(e) => RootTrust::Failed(e),
    }
}

struct TraversalState {
    exptime: Option<IsoTime>,
    soft: SoftFailures,
    qualified: QualifiedState,
}

/// Validates the chain for the request's target certificate.
///
/// The verdict is returned and also recorded on `results` together with the
/// nearest expiration time among the visited chain members. The
/// qualified-signature classification is cached on the target certificate
/// even when validation fails.
pub fn validate_chain(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    session: &mut ValidationSession,
    request: ValidationRequest<'_>,
    results: &mut ChainValidationResults,
) -> Result<()> {
    let ValidationRequest {
        target,
        flags,
        list_mode,
        use_ocsp,
        output,
    } = request;
    let mut diag = DiagnosticOutput::new(list_mode, output);
    let skip_revocation = flags.contains(ValidationFlag::NoDirmngr);

    if settings.no_chain_validation && !list_mode {
        warn!("bypassing certificate chain validation");
        results.set_validation_status(ChainValidationStatus::Valid);
        return Ok(());
    }

    let mut state = TraversalState {
        exptime: None,
        soft: SoftFailures::default(),
        qualified: QualifiedState::Unknown,
    };

    let outcome = traverse_chain(
        env,
        settings,
        session,
        &mut diag,
        &mut state,
        &target,
        skip_revocation,
        use_ocsp,
    )
    .and_then(|()| {
        if !list_mode {
            if settings.no_policy_check {
                info!("policies not checked due to --disable-policy-checks option");
            }
            if settings.no_crl_check && !use_ocsp {
                info!("CRLs not checked due to --disable-crl-checks option");
            }
        }
        // collapse soft failures into the most critical verdict
        state.soft.collapse()
    });

    // Whatever was learned about the qualified signature capability is
    // stored on the target, even when the validation itself failed.
    if let Some(flag) = state.qualified.decided() {
        env.annotations().set_qualified_flag(&target, flag);
    }

    results.set_nearest_not_after(state.exptime);
    match &outcome {
        Ok(()) => results.set_validation_status(ChainValidationStatus::Valid),
        Err(e) => results.set_validation_status(e.status()),
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn traverse_chain(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    session: &mut ValidationSession,
    diag: &mut DiagnosticOutput<'_>,
    state: &mut TraversalState,
    target: &CertHandle,
    skip_revocation: bool,
    use_ocsp: bool,
) -> Result<()> {
    let store = env.key_store()?;
    let mut cursor = KeyStoreCursor::new(store);
    let current_time = IsoTime::now();
    let mut depth: usize = 0;
    let mut subject_cert: CertHandle = target.clone();

    loop {
        let issuer_dn = subject_cert.issuer.clone();
        if issuer_dn.is_empty() {
            diag.emit(true, "no issuer found in certificate");
            return Err(Error::Validation(ChainValidationStatus::BadCertificate));
        }

        // Query the trust list for a self-issued certificate right away, so
        // that the per-root flags are available before the signature check.
        let root_trust = if subject_cert.is_root() {
            Some(query_root_trust(env, &subject_cert))
        } else {
            None
        };

        // Validity period. The earliest notAfter seen so far is carried
        // along as the chain's expiration time.
        if let Some(not_after) = subject_cert.not_after {
            state.exptime = Some(match state.exptime {
                Some(exptime) if exptime <= not_after => exptime,
                _ => not_after,
            });
        }
        if let Some(not_before) = subject_cert.not_before {
            if current_time < not_before {
                diag.emit(true, "certificate not yet valid");
                if !diag.list_mode() {
                    info!("(valid from {})", not_before);
                }
                return Err(Error::Validation(ChainValidationStatus::CertificateTooYoung));
            }
        }
        if let Some(not_after) = subject_cert.not_after {
            if current_time > not_after {
                diag.emit(!settings.ignore_expiration, "certificate has expired");
                if !diag.list_mode() {
                    info!("(expired at {})", not_after);
                }
                if settings.ignore_expiration {
                    warn!("ignoring expiration");
                } else {
                    state.soft.any_expired = true;
                }
            }
        }

        // assert that we understand all critical extensions
        check_critical_extensions(&subject_cert, diag)?;

        if !settings.no_policy_check {
            match check_cert_policy(&subject_cert, settings, diag) {
                Ok(()) => {}
                Err(Error::Validation(ChainValidationStatus::NoPolicyMatch)) => {
                    state.soft.any_no_policy_match = true;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(root_trust) = root_trust {
            let trusted_flags = match &root_trust {
                RootTrust::Trusted(flags) => Some(*flags),
                _ => None,
            };

            if trusted_flags.is_none() {
                // Only check the self-signature when the certificate is not
                // already trusted, for better diagnostics.
                if env
                    .check_cert_signature(&subject_cert, &subject_cert)
                    .is_err()
                {
                    diag.emit(true, "self-signed certificate has a BAD signature");
                    return Err(Error::Validation(if depth > 0 {
                        ChainValidationStatus::BadCertificateChain
                    } else {
                        ChainValidationStatus::BadCertificate
                    }));
                }
            }

            let relax = trusted_flags.map(|f| f.relax).unwrap_or(false);
            if !relax {
                allowed_ca(env, settings, &subject_cert, diag)?;
            }

            // The qualified signature flag is deduced from the root.
            state.qualified = classify_qualified_root(env, target, &subject_cert, state.qualified);

            // act on the trust verdict
            match root_trust {
                RootTrust::Trusted(_) => {}
                RootTrust::NotTrusted => {
                    diag.emit(false, "root certificate is not marked trusted");
                    // When the chain is already expired there is no point
                    // in asking whether the root shall be trusted; in list
                    // mode each root is asked about at most once per
                    // session.
                    let mut promoted = false;
                    if !state.soft.any_expired
                        && (!diag.list_mode()
                            || !session.already_asked_mark_trusted(&subject_cert))
                    {
                        info!("fingerprint={}", subject_cert.hex_fingerprint());
                        let rc2 = if session.no_more_trust_prompts {
                            Err(Error::NotSupported)
                        } else {
                            env.trust_agent()
                                .and_then(|agent| agent.mark_trusted(&subject_cert))
                        };
                        match rc2 {
                            Ok(()) => {
                                info!("root certificate has now been marked as trusted");
                                promoted = true;
                            }
                            Err(e) => {
                                if !diag.list_mode() {
                                    info!(
                                        "after checking the fingerprint, you may want to add it \
                                         manually to the list of trusted certificates."
                                    );
                                }
                                match e {
                                    Error::NotSupported => {
                                        if !session.no_more_trust_prompts {
                                            info!(
                                                "interactive marking as trusted not enabled in \
                                                 the agent"
                                            );
                                        }
                                        session.no_more_trust_prompts = true;
                                    }
                                    Error::Canceled => {
                                        info!(
                                            "interactive marking as trusted disabled for this \
                                             session"
                                        );
                                        session.no_more_trust_prompts = true;
                                    }
                                    _ => session.set_already_asked_mark_trusted(&subject_cert),
                                }
                            }
                        }
                    }
                    if !promoted {
                        return Err(Error::Validation(ChainValidationStatus::NotTrusted));
                    }
                }
                RootTrust::Failed(e) => {
                    error!("checking the trust list failed: {}", e);
                    return Err(e);
                }
            }

            // Check for revocations. A trusted root that carries proper
            // Basic Constraints was already checked once as an issuer.
            if !(skip_revocation || settings.no_trusted_cert_crl_check || relax) {
                is_cert_still_valid(
                    env,
                    settings,
                    use_ocsp,
                    diag,
                    &subject_cert,
                    &subject_cert,
                    &mut state.soft,
                )?;
            }

            // a self-signed certificate is the chain end
            return Ok(());
        }

        // take care that the chain does not get too long
        depth += 1;
        if depth > MAX_CHAIN_DEPTH {
            diag.emit(true, "certificate chain too long");
            return Err(Error::Validation(ChainValidationStatus::BadCertificateChain));
        }

        // find the next certificate up the tree
        cursor.search_reset();
        match find_up(env, settings, &mut cursor, &subject_cert, &issuer_dn, false) {
            Ok(()) => {}
            Err(Error::NotFound) => {
                diag.emit(false, "issuer certificate not found");
                if !diag.list_mode() {
                    info!("issuer certificate: #/{}", issuer_dn);
                }
                return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
            }
            Err(e) => {
                error!("failed to find issuer's certificate: {}", e);
                return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
            }
        }
        let mut issuer_cert = match cursor.get_cert() {
            Ok(cert) => cert,
            Err(e) => {
                error!("reading certificate at cursor failed: {}", e);
                return Err(Error::Validation(ChainValidationStatus::General));
            }
        };

        // Verify the signature, trying further issuer candidates on a bad
        // signature: some CAs reuse the issuer and subject DN for new root
        // certificates. Every candidate image seen is recorded so a
        // resolver that yields the same certificate twice cannot loop.
        let mut seen_issuers: Vec<Vec<u8>> = vec![issuer_cert.encoded_cert.clone()];
        loop {
            match env.check_cert_signature(&issuer_cert, &subject_cert) {
                Ok(()) => break,
                Err(e) => {
                    diag.emit(false, "certificate has a BAD signature");
                    let try_next = matches!(
                        e,
                        Error::Validation(ChainValidationStatus::BadSignature)
                    ) && seen_issuers.len() < MAX_ISSUER_CANDIDATES
                        && find_up(env, settings, &mut cursor, &subject_cert, &issuer_dn, true)
                            .is_ok();
                    if try_next {
                        if let Ok(tmp_cert) = cursor.get_cert() {
                            if !seen_issuers.contains(&tmp_cert.encoded_cert) {
                                diag.emit(
                                    false,
                                    "found another possible matching CA certificate - trying again",
                                );
                                seen_issuers.push(tmp_cert.encoded_cert.clone());
                                issuer_cert = tmp_cert;
                                continue;
                            }
                        }
                    }
                    return Err(Error::Validation(ChainValidationStatus::BadCertificateChain));
                }
            }
        }

        // Check that the CA is allowed to issue certificates. The trust
        // list is only probed on failure: the majority of certificates
        // carry proper Basic Constraints, and a trusted root with the relax
        // flag overrides the error with an unbounded chain length.
        let mut issuer_root_trust: Option<RootTrust> = None;
        let chain_len = match allowed_ca(env, settings, &issuer_cert, diag) {
            Ok(chain_len) => chain_len,
            Err(e) => {
                let mut overridden = None;
                if issuer_cert.is_root() {
                    let rt = query_root_trust(env, &issuer_cert);
                    if let RootTrust::Trusted(flags) = &rt {
                        if flags.relax {
                            overridden = Some(-1);
                        }
                    }
                    issuer_root_trust = Some(rt);
                }
                match overridden {
                    Some(chain_len) => chain_len,
                    None => return Err(e),
                }
            }
        };
        if chain_len >= 0 && (depth as i64 - 1) > chain_len {
            diag.emit(
                true,
                &format!("certificate chain longer than allowed by CA ({})", chain_len),
            );
            return Err(Error::Validation(ChainValidationStatus::BadCertificateChain));
        }

        // is the certificate allowed to sign other certificates?
        if !diag.list_mode() && !issuer_cert.may_sign_certificates() {
            diag.emit(
                true,
                "issuer certificate may not be used for certificate signing",
            );
            return Err(Error::Validation(ChainValidationStatus::BadCertificate));
        }

        // Revocation check for this edge. A root issuer with proper Basic
        // Constraints is checked here and again when it becomes the
        // subject; only the relax exception path skips this edge.
        let issuer_relax = matches!(
            &issuer_root_trust,
            Some(RootTrust::Trusted(flags)) if flags.relax
        );
        if skip_revocation {
            // directory checks disabled for this request
        } else if issuer_root_trust.is_some()
            && (settings.no_trusted_cert_crl_check || issuer_relax)
        {
            // the root is checked once it becomes the subject
        } else {
            is_cert_still_valid(
                env,
                settings,
                use_ocsp,
                diag,
                &subject_cert,
                &issuer_cert,
                &mut state.soft,
            )?;
        }

        if settings.verbose && !diag.list_mode() {
            info!("certificate is good");
        }

        // for the next round the current issuer becomes the new subject
        cursor.search_reset();
        subject_cert = issuer_cert;
    }
}

/// `basic_cert_check` verifies that the given certificate carries a good
/// signature, without enforcing any constraints: the self-signature for a
/// root, the issuer's signature otherwise. The issuer certificate is
/// assumed to be in the key store already.
pub fn basic_cert_check(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    cert: &CertHandle,
) -> Result<()> {
    if settings.no_chain_validation {
        warn!("bypassing basic certificate checks");
        return Ok(());
    }

    let issuer_dn = cert.issuer.clone();
    if issuer_dn.is_empty() {
        error!("no issuer found in certificate");
        return Err(Error::Validation(ChainValidationStatus::BadCertificate));
    }

    if cert.is_root() {
        if let Err(e) = env.check_cert_signature(cert, cert) {
            error!("self-signed certificate has a BAD signature: {}", e);
            return Err(Error::Validation(ChainValidationStatus::BadCertificate));
        }
        return Ok(());
    }

    let store = env.key_store()?;
    let mut cursor = KeyStoreCursor::new(store);
    cursor.search_reset();
    match find_up(env, settings, &mut cursor, cert, &issuer_dn, false) {
        Ok(()) => {}
        Err(Error::NotFound) => {
            info!("issuer certificate (#/{}) not found", issuer_dn);
            return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
        }
        Err(e) => {
            error!("failed to find issuer's certificate: {}", e);
            return Err(Error::Validation(ChainValidationStatus::MissingCertificate));
        }
    }
    let issuer_cert = match cursor.get_cert() {
        Ok(cert) => cert,
        Err(e) => {
            error!("reading certificate at cursor failed: {}", e);
            return Err(Error::Validation(ChainValidationStatus::General));
        }
    };

    if let Err(e) = env.check_cert_signature(&issuer_cert, cert) {
        error!("certificate has a BAD signature: {}", e);
        return Err(Error::Validation(ChainValidationStatus::BadCertificate));
    }
    if settings.verbose {
        info!("certificate is good");
    }
    Ok(())
}
