//! Workaround for German signature law CA certificates
//!
//! The certificates issued by the German authority for qualified
//! signatures (RegTP, later Bundesnetzagentur) do not carry a
//! basicConstraints extension. They are recognised by walking up to the
//! root and checking whether that root appears on the qualified-signature
//! list with country code `de`; the permitted chain length is then
//! synthesised. The signature law demands a three tier hierarchy, so the
//! walk never needs more than four certificates.

use log::error;

use crate::environment::ChainEnvironment;
use crate::source::issuer_resolver::next_in_chain;
use crate::util::error::Error;
use crate::validator::annotations::RegTpStatus;
use crate::validator::cert::CertHandle;
use crate::validator::settings::ValidationSettings;

const MAX_REGTP_WALK: usize = 4;

/// `regtp_ca_info` reports whether `cert` is a RegTP issued CA certificate
/// (the root itself or the CA below it). On recognition the permitted
/// chain length (0 or 1) is returned.
///
/// The outcome is cached in the annotations store, for the target on a
/// negative answer and for the root and the CA below it on a positive one,
/// to avoid repeated chain walks.
pub fn regtp_ca_info(
    env: &ChainEnvironment,
    settings: &ValidationSettings,
    cert: &CertHandle,
) -> Option<u8> {
    if let Some(status) = env.annotations().regtp_status(cert) {
        return match status {
            RegTpStatus::NotRegTp => None,
            RegTpStatus::CaWithChainLen(n) => Some(n),
        };
    }

    // Gather the info: walk up the chain until the root is reached. The
    // walk performs no CA checks of its own.
    let mut chain: Vec<CertHandle> = vec![cert.clone()];
    let mut reached_root = false;
    while chain.len() < MAX_REGTP_WALK {
        let top = match chain.last() {
            Some(top) => top.clone(),
            None => break,
        };
        match next_in_chain(env, settings, &top) {
            Ok(Some(next)) => chain.push(next),
            Ok(None) => {
                reached_root = true;
                break;
            }
            Err(Error::Validation(_)) => break,
            Err(e) => {
                error!("walking the certificate chain failed: {}", e);
                break;
            }
        }
    }

    if reached_root {
        let is_de_root = chain.last().is_some_and(|root| {
            matches!(
                env.trust_agent().and_then(|agent| agent.qualified_list_entry(root)),
                Ok(country) if country == "de"
            )
        });
        if is_de_root {
            // Setting the path length for the root CA and the CA flag for
            // the one below is all that is needed.
            let depth = chain.len();
            if let Some(root) = chain.last() {
                env.annotations()
                    .set_regtp_status(root, RegTpStatus::CaWithChainLen(1));
            }
            if depth > 1 {
                env.annotations()
                    .set_regtp_status(&chain[depth - 2], RegTpStatus::CaWithChainLen(0));
            }
            return Some(if depth > 1 { 0 } else { 1 });
        }
    }

    // Nothing special with this certificate. Mark it anyway to avoid
    // duplicate lookups.
    env.annotations().set_regtp_status(cert, RegTpStatus::NotRegTp);
    None
}
