//! Thin hex encode/decode wrappers so call sites don't need to know which
//! underlying hex crate is in use.

use bitcoin::hex::{DisplayHex, FromHex};
use thiserror::Error;

/// Hex decoding error
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid hex string
    #[error(transparent)]
    Decode(#[from] bitcoin::hex::HexToBytesError),
}

/// Decode a hex string into bytes.
pub fn decode<S: AsRef<str>>(hex: S) -> Result<Vec<u8>, Error> {
    Ok(Vec::from_hex(hex.as_ref())?)
}

/// Encode bytes as a lowercase hex string.
pub fn encode<T: AsRef<[u8]>>(bytes: T) -> String {
    bytes.as_ref().to_lower_hex_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        let encoded = encode(bytes);
        assert_eq!(encoded, "deadbeef");
        assert_eq!(decode(encoded).unwrap(), bytes.to_vec());
    }
}
