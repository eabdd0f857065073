//! Qualified signature classification
//!
//! Whether a certificate can be used for qualified signatures is deduced
//! from the root of its chain: the root must appear on the authoritative
//! qualified-signature list. The answer is derived once per validation at
//! the root and cached per certificate.

use log::error;

use crate::environment::ChainEnvironment;
use crate::util::error::Error;
use crate::validator::cert::CertProfile;

/// Whether the chain under validation stems from a qualified-signature
/// root.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QualifiedState {
    /// Not yet determined
    Unknown,
    /// The chain does not stem from a qualified root
    No,
    /// The chain stems from a qualified root
    Yes,
}

impl QualifiedState {
    /// Returns the decided flag, or None while unknown.
    pub fn decided(&self) -> Option<bool> {
        match self {
            QualifiedState::Unknown => None,
            QualifiedState::No => Some(false),
            QualifiedState::Yes => Some(true),
        }
    }
}

/// `classify_qualified_root` resolves the qualified flag once the root of
/// the chain is known.
///
/// A previously cached flag on the target is adopted as is; otherwise the
/// trust agent's qualified-signature list decides and the answer is cached
/// on the root. A failing list lookup leaves the state unknown.
pub fn classify_qualified_root(
    env: &ChainEnvironment,
    target: &CertProfile,
    root: &CertProfile,
    current: QualifiedState,
) -> QualifiedState {
    if current != QualifiedState::Unknown {
        return current;
    }

    if let Some(flag) = env.annotations().qualified_flag(target) {
        // already checked for this certificate
        return if flag {
            QualifiedState::Yes
        } else {
            QualifiedState::No
        };
    }

    let state = match env
        .trust_agent()
        .and_then(|agent| agent.qualified_list_entry(root))
    {
        Ok(_country) => QualifiedState::Yes,
        Err(Error::NotFound) => QualifiedState::No,
        Err(e) => {
            error!(
                "checking the list of qualified root certificates failed: {}",
                e
            );
            QualifiedState::Unknown
        }
    };

    if let Some(flag) = state.decided() {
        // cache the result; a lost write only costs a later lookup
        env.annotations().set_qualified_flag(root, flag);
    }
    state
}
