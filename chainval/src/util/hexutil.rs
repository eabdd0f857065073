//! Hex rendering for fingerprints and key identifiers

use core::str;

use subtle_encoding::hex;

/// `buffer_to_hex` takes a byte array and returns a string featuring upper
/// case ASCII hex characters (without commas, spaces, or brackets).
/// ```
/// use chainval::buffer_to_hex;
/// let buf: [u8; 3] = [1, 2, 3];
/// assert_eq!(buffer_to_hex(&buf), "010203");
/// ```
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = hex::encode_upper(buffer);
    let r = str::from_utf8(hex.as_slice());
    if let Ok(s) = r {
        s.to_string()
    } else {
        "".to_string()
    }
}
