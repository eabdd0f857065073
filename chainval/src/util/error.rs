//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Verdicts that can result from a chain validation operation.
///
/// With the exception of [`Valid`](ChainValidationStatus::Valid), each value
/// names the most critical problem found while walking the chain. Soft
/// problems (expiry, revocation, missing or stale CRLs, policy mismatches)
/// are accumulated across the whole chain and collapsed into a single status
/// in priority order; all other values abort the traversal where they occur.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ChainValidationStatus {
    /// No errors were encountered while validating the chain
    Valid,
    /// A certificate in the chain is malformed for chain-building purposes,
    /// e.g. it has no issuer name, lacks the CA flag, or a self-signed root
    /// carries a bad self-signature at depth zero.
    BadCertificate,
    /// The chain itself cannot be assembled: an issuer signature does not
    /// verify, the chain exceeds the depth limit, or a path length
    /// constraint is violated.
    BadCertificateChain,
    /// A signature over a certificate did not verify.
    BadSignature,
    /// A certificate's notBefore lies in the future.
    CertificateTooYoung,
    /// A certificate's notAfter has passed.
    CertificateExpired,
    /// A certificate in the chain has been revoked.
    CertificateRevoked,
    /// No CRL is known for a certificate in the chain.
    NoCrlKnown,
    /// The only available CRL for a certificate is too old.
    CrlTooOld,
    /// No policy from the administrator policy file matched the certificate
    /// policies extension.
    NoPolicyMatch,
    /// An issuer certificate could not be located in any store.
    MissingCertificate,
    /// The root certificate is not marked trusted and was not promoted.
    NotTrusted,
    /// A certificate carries a critical extension this implementation does
    /// not understand.
    UnsupportedCertificate,
    /// The configuration is unusable, e.g. a malformed policy file.
    Misconfiguration,
    /// Any failure without a more specific classification.
    General,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A chain validation problem with its status classification
    Validation(ChainValidationStatus),
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error condition does not match anything else here.
    Unrecognized,
    /// A policy file line exceeded the line buffer without a terminating newline
    LineTooLong,
    /// A policy file ended in an unterminated line
    IncompleteLine,
    /// An interactive operation was cancelled by the user
    Canceled,
    /// An operation is not supported by the configured collaborator
    NotSupported,
    /// A networking problem occurred while consulting an external service
    NetworkError,
    /// Asn1Error is used to propagate error information from the x509 stack.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [`std::io::ErrorKind`]
    StdIoError(std::io::ErrorKind),
}

impl Error {
    /// Returns the validation status conveyed by this error, with everything
    /// that carries no status collapsing to
    /// [`General`](ChainValidationStatus::General).
    pub fn status(&self) -> ChainValidationStatus {
        match self {
            Error::Validation(status) => *status,
            _ => ChainValidationStatus::General,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for ChainValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainValidationStatus::Valid => write!(f, "Valid"),
            ChainValidationStatus::BadCertificate => write!(f, "Bad certificate"),
            ChainValidationStatus::BadCertificateChain => write!(f, "Bad certificate chain"),
            ChainValidationStatus::BadSignature => write!(f, "Bad signature"),
            ChainValidationStatus::CertificateTooYoung => write!(f, "Certificate too young"),
            ChainValidationStatus::CertificateExpired => write!(f, "Certificate expired"),
            ChainValidationStatus::CertificateRevoked => write!(f, "Certificate revoked"),
            ChainValidationStatus::NoCrlKnown => write!(f, "No CRL known"),
            ChainValidationStatus::CrlTooOld => write!(f, "CRL too old"),
            ChainValidationStatus::NoPolicyMatch => write!(f, "No policy match"),
            ChainValidationStatus::MissingCertificate => write!(f, "Missing certificate"),
            ChainValidationStatus::NotTrusted => write!(f, "Not trusted"),
            ChainValidationStatus::UnsupportedCertificate => write!(f, "Unsupported certificate"),
            ChainValidationStatus::Misconfiguration => write!(f, "Misconfiguration"),
            ChainValidationStatus::General => write!(f, "General error"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(err) => write!(f, "ValidationError: {}", err),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::LineTooLong => write!(f, "LineTooLong"),
            Error::IncompleteLine => write!(f, "IncompleteLine"),
            Error::Canceled => write!(f, "Canceled"),
            Error::NotSupported => write!(f, "NotSupported"),
            Error::NetworkError => write!(f, "NetworkError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let _s = format!("{}", ChainValidationStatus::Valid);
        let _s = format!("{}", ChainValidationStatus::BadCertificate);
        let _s = format!("{}", ChainValidationStatus::BadCertificateChain);
        let _s = format!("{}", ChainValidationStatus::BadSignature);
        let _s = format!("{}", ChainValidationStatus::CertificateTooYoung);
        let _s = format!("{}", ChainValidationStatus::CertificateExpired);
        let _s = format!("{}", ChainValidationStatus::CertificateRevoked);
        let _s = format!("{}", ChainValidationStatus::NoCrlKnown);
        let _s = format!("{}", ChainValidationStatus::CrlTooOld);
        let _s = format!("{}", ChainValidationStatus::NoPolicyMatch);
        let _s = format!("{}", ChainValidationStatus::MissingCertificate);
        let _s = format!("{}", ChainValidationStatus::NotTrusted);
        let _s = format!("{}", ChainValidationStatus::UnsupportedCertificate);
        let _s = format!("{}", ChainValidationStatus::Misconfiguration);
        let _s = format!("{}", ChainValidationStatus::General);

        let _s = format!("{}", Error::NotFound);
        let _s = format!("{}", Error::Unrecognized);
        let _s = format!("{}", Error::LineTooLong);
        let _s = format!("{}", Error::IncompleteLine);
        let _s = format!("{}", Error::Canceled);
        let _s = format!("{}", Error::NotSupported);
        let _s = format!("{}", Error::NetworkError);
    }

    #[test]
    fn status_of_error() {
        assert_eq!(
            ChainValidationStatus::CertificateRevoked,
            Error::Validation(ChainValidationStatus::CertificateRevoked).status()
        );
        assert_eq!(ChainValidationStatus::General, Error::NotFound.status());
    }
}
