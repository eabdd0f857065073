//! Compact ISO timestamps used for validity window checks

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::util::error::{Error, Result};

/// A point in time in the compact ISO form `YYYYMMDDThhmmss`.
///
/// Certificate validity checks compare these values chronologically, which is
/// equivalent to a lexicographic compare of the normalised ISO rendering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct IsoTime(pub der::DateTime);

impl IsoTime {
    /// Returns the current system time.
    pub fn now() -> Self {
        IsoTime(
            der::DateTime::from_system_time(std::time::SystemTime::now())
                // values before 1970 or after 9999 are the only failures
                .unwrap_or(der::DateTime::INFINITY),
        )
    }

    /// Creates an [`IsoTime`] from seconds since the Unix epoch.
    pub fn from_unix_secs(v: u64) -> der::Result<Self> {
        Ok(Self(der::DateTime::from_unix_duration(Duration::from_secs(
            v,
        ))?))
    }

    /// Returns seconds since the Unix epoch for this value.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.unix_duration().as_secs()
    }
}

impl fmt::Display for IsoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minutes(),
            self.0.seconds()
        )
    }
}

impl FromStr for IsoTime {
    type Err = Error;

    /// Parses the compact `YYYYMMDDThhmmss` form.
    fn from_str(s: &str) -> Result<Self> {
        let b = s.as_bytes();
        if b.len() != 15 || b[8] != b'T' || !b.iter().enumerate().all(|(i, c)| i == 8 || c.is_ascii_digit()) {
            return Err(Error::Unrecognized);
        }
        let num = |r: core::ops::Range<usize>| -> u16 {
            s[r].parse::<u16>().unwrap_or(0)
        };
        der::DateTime::new(
            num(0..4),
            num(4..6) as u8,
            num(6..8) as u8,
            num(9..11) as u8,
            num(11..13) as u8,
            num(13..15) as u8,
        )
        .map(IsoTime)
        .map_err(Error::Asn1Error)
    }
}
