//! Per-call request and per-session state for chain validation

use std::collections::BTreeSet;
use std::io::Write;

use flagset::{flags, FlagSet};

use crate::validator::cert::{CertHandle, CertProfile};

flags! {
    /// Per-request behaviour flags.
    pub enum ValidationFlag: u32 {
        /// Bit 0: do not perform any directory validity (CRL/OCSP) checks.
        NoDirmngr = 0b1,
    }
}

/// One chain validation request: the target certificate plus the options
/// that vary per call rather than per deployment.
pub struct ValidationRequest<'a> {
    /// The end-entity certificate to validate
    pub target: CertHandle,
    /// Behaviour flags; bit 0 skips revocation checks
    pub flags: FlagSet<ValidationFlag>,
    /// List mode: diagnostics go bracketed to `output` instead of the log
    pub list_mode: bool,
    /// Prefer OCSP over CRL when consulting the directory service
    pub use_ocsp: bool,
    /// Sink for diagnostic lines in list mode
    pub output: Option<&'a mut dyn Write>,
}

impl<'a> ValidationRequest<'a> {
    /// Creates a request with default options for `target`.
    pub fn new(target: CertHandle) -> Self {
        ValidationRequest {
            target,
            flags: FlagSet::default(),
            list_mode: false,
            use_ocsp: false,
            output: None,
        }
    }
}

/// Session-scoped state for interactive trust promotion.
///
/// Tracks which roots the user was already asked about, so a listing that
/// touches the same untrusted root repeatedly prompts at most once, and
/// whether prompting was found to be unavailable or declined, which
/// disables further prompts for the rest of the session. One instance is
/// owned by the caller and passed to every validation of the session.
#[derive(Default)]
pub struct ValidationSession {
    asked_mark_trusted: BTreeSet<[u8; 20]>,
    /// No more interactive trust prompts during this session.
    pub no_more_trust_prompts: bool,
}

impl ValidationSession {
    /// Creates a fresh session.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns true if the user was already asked whether `root` shall be
    /// marked as trusted during this session.
    pub fn already_asked_mark_trusted(&self, root: &CertProfile) -> bool {
        self.asked_mark_trusted.contains(&root.fingerprint())
    }

    /// Flags `root` as already asked about.
    pub fn set_already_asked_mark_trusted(&mut self, root: &CertProfile) {
        self.asked_mark_trusted.insert(root.fingerprint());
    }
}
