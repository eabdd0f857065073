//! Certificate policies check against the administrator policy file
//!
//! The certificate carries its policies as a line oriented list of
//! `OID:N` / `OID:C` records (see
//! [`CertProfile::policies`](crate::CertProfile)). The administrator policy
//! file lists one allowed policy OID per line; the first token of a line up
//! to a space, colon or end of line is the OID, `#` starts a comment. A
//! certificate passes when any allowed OID appears at the start of a policy
//! record. Without a match, critical policies fail the certificate while
//! non-critical ones only produce a note.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};

use log::info;

use crate::util::error::{ChainValidationStatus, Error, Result};
use crate::util::logging::DiagnosticOutput;
use crate::validator::cert::CertProfile;
use crate::validator::settings::ValidationSettings;

// gpgsm sized its policy line buffer at 256 bytes; keep that limit
const POLICY_LINE_MAX: usize = 254;

fn no_match(any_critical: bool, diag: &mut DiagnosticOutput<'_>) -> Result<()> {
    if !any_critical {
        diag.emit(false, "note: non-critical certificate policy not allowed");
        return Ok(());
    }
    diag.emit(true, "certificate policy not allowed");
    Err(Error::Validation(ChainValidationStatus::NoPolicyMatch))
}

/// `check_cert_policy` matches the certificate's policies against the
/// configured policy file.
///
/// A certificate without a policies extension always passes. With no policy
/// file configured (or an unreadable one), certificates with critical
/// policies fail with `NoPolicyMatch` while non-critical policies only
/// produce a note. Malformed policy file lines yield `Misconfiguration`;
/// over-long or unterminated lines yield `LineTooLong` / `IncompleteLine`.
pub fn check_cert_policy(
    cert: &CertProfile,
    settings: &ValidationSettings,
    diag: &mut DiagnosticOutput<'_>,
) -> Result<()> {
    let policies = match &cert.policies {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(()), // no policy given
    };

    if settings.verbose && !diag.list_mode() {
        info!("certificate's policy list: {}", policies);
    }

    // minimal check, but will not give false positives
    let any_critical = policies.contains(":C");

    let path = match &settings.policy_file {
        Some(path) => path,
        None => {
            if any_critical {
                diag.emit(true, "critical marked policy without configured policies");
                return Err(Error::Validation(ChainValidationStatus::NoPolicyMatch));
            }
            return Ok(());
        }
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            if settings.verbose || e.kind() != ErrorKind::NotFound {
                info!("failed to open `{}': {}", path.display(), e);
            }
            // with no critical policies this is only a warning
            return no_match(any_critical, diag);
        }
    };

    let mut reader = BufReader::new(file);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            // reached EOF without a match
            return no_match(any_critical, diag);
        }
        if !line.ends_with('\n') {
            return Err(if line.len() >= POLICY_LINE_MAX {
                Error::LineTooLong
            } else {
                Error::IncompleteLine
            });
        }
        if line.len() - 1 > POLICY_LINE_MAX {
            return Err(Error::LineTooLong);
        }

        // allow for empty lines, leading spaces and comments
        let body = line.trim_start_matches([' ', '\t']);
        if body == "\n" || body.starts_with('#') {
            continue;
        }

        // the first token up to space, colon or newline is the allowed OID
        let allowed = match body.find([' ', ':', '\n']) {
            Some(end) if end > 0 => &body[..end],
            _ => return Err(Error::Validation(ChainValidationStatus::Misconfiguration)),
        };

        // see whether ALLOWED appears in POLICIES at the start of a record
        let bytes = policies.as_bytes();
        let mut start = 0;
        while let Some(pos) = policies[start..].find(allowed) {
            let p = start + pos;
            let at_line_start = p == 0 || bytes[p - 1] == b'\n';
            let delimited = bytes.get(p + allowed.len()) == Some(&b':');
            if at_line_start && delimited {
                return Ok(());
            }
            start = p + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::cert::CertProfile;
    use spki::AlgorithmIdentifierOwned;
    use std::io::Write;
    use std::path::PathBuf;

    fn cert_with_policies(policies: Option<&str>) -> CertProfile {
        CertProfile {
            encoded_cert: vec![0x30],
            subject: "CN=Leaf".to_string(),
            issuer: "CN=Root".to_string(),
            serial: vec![1],
            not_before: None,
            not_after: None,
            extensions: vec![],
            aki: None,
            ski: None,
            basic_constraints: None,
            policies: policies.map(str::to_string),
            spki: vec![],
            tbs: vec![],
            signature: vec![],
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: crate::ALG_SHA256_WITH_RSA_ENCRYPTION,
                parameters: None,
            },
        }
    }

    fn write_policy_file(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("chainval-policy-{}-{}", std::process::id(), name));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn settings_with(path: Option<PathBuf>) -> ValidationSettings {
        ValidationSettings {
            policy_file: path,
            ..Default::default()
        }
    }

    #[test]
    fn no_policies_always_pass() {
        let cert = cert_with_policies(None);
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_cert_policy(&cert, &settings_with(None), &mut diag).is_ok());
    }

    #[test]
    fn critical_policy_without_file_fails() {
        let cert = cert_with_policies(Some("1.3.6.1.4.1.99.1:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NoPolicyMatch)),
            check_cert_policy(&cert, &settings_with(None), &mut diag)
        );
    }

    #[test]
    fn noncritical_policy_without_file_passes() {
        let cert = cert_with_policies(Some("1.3.6.1.4.1.99.1:N"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_cert_policy(&cert, &settings_with(None), &mut diag).is_ok());
    }

    #[test]
    fn matching_policy_passes() {
        let path = write_policy_file("match", "# allowed policies\n1.3.6.1.4.1.88\n");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.88:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag).is_ok());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn prefix_of_longer_oid_does_not_match() {
        let path = write_policy_file("prefix", "1.3.6.1.4.1.88\n");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.888:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NoPolicyMatch)),
            check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag)
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn second_record_matches() {
        let path = write_policy_file("second", "1.3.6.1.4.1.88\n");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.99.1:C\n1.3.6.1.4.1.88:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert!(check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag).is_ok());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn malformed_line_is_misconfiguration() {
        let path = write_policy_file("malformed", ":justacolon\n");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.88:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::Misconfiguration)),
            check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag)
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn overlong_line_is_rejected() {
        let long = format!("{}\n", "1.".repeat(200));
        let path = write_policy_file("long", &long);
        let cert = cert_with_policies(Some("1.3.6.1.4.1.88:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::LineTooLong),
            check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag)
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unterminated_final_line_is_rejected() {
        let path = write_policy_file("unterminated", "1.3.6.1.4.1.77");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.88:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::IncompleteLine),
            check_cert_policy(&cert, &settings_with(Some(path.clone())), &mut diag)
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_with_critical_policy_fails() {
        let mut path = std::env::temp_dir();
        path.push("chainval-policy-does-not-exist");
        let cert = cert_with_policies(Some("1.3.6.1.4.1.99.1:C"));
        let mut diag = DiagnosticOutput::new(false, None);
        assert_eq!(
            Err(Error::Validation(ChainValidationStatus::NoPolicyMatch)),
            check_cert_policy(&cert, &settings_with(Some(path)), &mut diag)
        );
    }
}
