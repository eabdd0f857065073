//! Configuration governing chain validation

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options consulted during chain validation.
///
/// The defaults enable every check; each flag selectively disables one.
/// Instances round-trip through serde so deployments can keep them in a
/// configuration file.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Bypass chain validation entirely (outside list mode), with a warning.
    pub no_chain_validation: bool,

    /// Skip the certificate policies check.
    pub no_policy_check: bool,

    /// Path to the administrator policy file listing allowed policy OIDs,
    /// one per line. When unset, certificates with critical policies fail.
    pub policy_file: Option<PathBuf>,

    /// Skip CRL checks (OCSP checks, when requested, still run).
    pub no_crl_check: bool,

    /// Skip the CRL check on trusted root certificates.
    pub no_trusted_cert_crl_check: bool,

    /// Ask the directory service for missing issuer certificates.
    pub auto_issuer_key_retrieve: bool,

    /// Treat expired certificates as valid, logging a warning.
    pub ignore_expiration: bool,

    /// Emit additional informational log output.
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_roundtrip_through_json() {
        let mut settings = ValidationSettings::default();
        settings.auto_issuer_key_retrieve = true;
        settings.policy_file = Some(PathBuf::from("/etc/chainval/policies"));

        let json = serde_json::to_string(&settings).unwrap();
        let back: ValidationSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn missing_fields_default_off() {
        let settings: ValidationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(ValidationSettings::default(), settings);
        assert!(!settings.no_crl_check);
    }
}
