//! Results collected from a chain validation operation

use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::iso_time::IsoTime;

/// `ChainValidationResults` collects the outcome of one validation pass:
/// the status classification and the nearest expiration time among the
/// chain members. The expiration time is reported even when validation
/// fails, as far as the traversal got.
#[derive(Clone, Debug, Default)]
pub struct ChainValidationResults {
    status: Option<ChainValidationStatus>,
    nearest_not_after: Option<IsoTime>,
}

impl ChainValidationResults {
    /// Creates a new [`ChainValidationResults`]
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the validation status, replacing any earlier value.
    pub fn set_validation_status(&mut self, status: ChainValidationStatus) {
        self.status = Some(status);
    }

    /// Returns the recorded validation status.
    pub fn validation_status(&self) -> Option<ChainValidationStatus> {
        self.status
    }

    /// Records the earliest notAfter seen in the chain.
    pub fn set_nearest_not_after(&mut self, t: Option<IsoTime>) {
        self.nearest_not_after = t;
    }

    /// Returns the earliest notAfter among all chain members visited.
    pub fn nearest_not_after(&self) -> Option<IsoTime> {
        self.nearest_not_after
    }
}

/// Soft failures accumulated while walking a chain.
///
/// These do not abort the traversal; after a complete walk they collapse
/// into a single verdict, most critical first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftFailures {
    /// Some chain member has expired
    pub any_expired: bool,
    /// Some chain member has been revoked
    pub any_revoked: bool,
    /// No CRL was available for some chain member
    pub any_no_crl: bool,
    /// Only a stale CRL was available for some chain member
    pub any_crl_too_old: bool,
    /// Some chain member's policies matched no configured policy
    pub any_no_policy_match: bool,
}

impl SoftFailures {
    /// Collapses the accumulated failures into a single verdict in the
    /// priority order revoked > expired > no CRL > stale CRL > policy
    /// mismatch.
    pub fn collapse(&self) -> Result<()> {
        if self.any_revoked {
            Err(Error::Validation(ChainValidationStatus::CertificateRevoked))
        } else if self.any_expired {
            Err(Error::Validation(ChainValidationStatus::CertificateExpired))
        } else if self.any_no_crl {
            Err(Error::Validation(ChainValidationStatus::NoCrlKnown))
        } else if self.any_crl_too_old {
            Err(Error::Validation(ChainValidationStatus::CrlTooOld))
        } else if self.any_no_policy_match {
            Err(Error::Validation(ChainValidationStatus::NoPolicyMatch))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_priority() {
        let mut soft = SoftFailures::default();
        assert!(soft.collapse().is_ok());

        soft.any_no_policy_match = true;
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NoPolicyMatch)),
            soft.collapse()
        );
        soft.any_crl_too_old = true;
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::CrlTooOld)),
            soft.collapse()
        );
        soft.any_no_crl = true;
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NoCrlKnown)),
            soft.collapse()
        );
        soft.any_expired = true;
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::CertificateExpired)),
            soft.collapse()
        );
        soft.any_revoked = true;
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::CertificateRevoked)),
            soft.collapse()
        );
    }
}
