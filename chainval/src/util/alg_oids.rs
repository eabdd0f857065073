//! Object identifier constants for the signature and digest algorithms the
//! default verifier understands

use der::asn1::ObjectIdentifier;

/// OID for RSA encryption: 1.2.840.113549.1.1.1
pub const ALG_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// OID for SHA-224 with RSA encryption: 1.2.840.113549.1.1.14
pub const ALG_SHA224_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");

/// OID for SHA-256 with RSA encryption: 1.2.840.113549.1.1.11
pub const ALG_SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// OID for SHA-384 with RSA encryption: 1.2.840.113549.1.1.12
pub const ALG_SHA384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");

/// OID for SHA-512 with RSA encryption: 1.2.840.113549.1.1.13
pub const ALG_SHA512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// OID for ECDSA with SHA-256: 1.2.840.10045.4.3.2
pub const ALG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// OID for ECDSA with SHA-384: 1.2.840.10045.4.3.3
pub const ALG_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

/// OID for elliptic curve public keys: 1.2.840.10045.2.1
pub const ALG_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// OID for the NIST P-256 curve: 1.2.840.10045.3.1.7
pub const CURVE_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// OID for the NIST P-384 curve: 1.3.132.0.34
pub const CURVE_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
