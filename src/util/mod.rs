//! Shared utilities: the global secp256k1 context, wall-clock helpers and
//! CBOR diagnostics used by the token codec.

use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin::secp256k1::rand::rngs::OsRng;
use bitcoin::secp256k1::{All, Secp256k1};
use once_cell::sync::Lazy;

pub mod hex;
pub mod serde_helpers;

/// Process-wide secp256k1 context, randomized once at first use.
pub static SECP256K1: Lazy<Secp256k1<All>> = Lazy::new(|| {
    let mut ctx = Secp256k1::new();
    ctx.randomize(&mut OsRng);
    ctx
});

/// Seconds since the Unix epoch.
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Error type for CBOR diagnostic serialization.
#[derive(Debug, thiserror::Error)]
pub enum CborError {
    /// CBOR serialization error
    #[error("CBOR serialization error")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),

    /// CBOR diagnostic notation error
    #[error("CBOR diagnostic notation error: {0}")]
    CborDiag(#[from] cbor_diag::Error),
}

/// Serializes a struct to the CBOR diagnostic notation, useful for logging
/// and debugging token envelopes without dumping raw bytes.
///
/// See <https://www.rfc-editor.org/rfc/rfc8949.html#name-diagnostic-notation>
pub fn serialize_to_cbor_diag<T: serde::Serialize>(data: &T) -> Result<String, CborError> {
    let mut cbor_buffer = Vec::new();
    ciborium::ser::into_writer(data, &mut cbor_buffer)?;

    let diag = cbor_diag::parse_bytes(&cbor_buffer)?;
    Ok(diag.to_diag_pretty())
}
