//! Blind Diffie-Hellman key exchange: the blind-signing primitive that
//! lets a mint sign a secret without learning it.

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::PublicKey as Secp256k1PublicKey;
use thiserror::Error;

use crate::nuts::nut01::{PublicKey, SecretKey};
use crate::util::SECP256K1;

const DOMAIN_SEPARATOR: &[u8; 28] = b"Secp256k1_HashToCurve_Cashu_";

/// DHKE errors
#[derive(Debug, Error)]
pub enum Error {
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// Hash-to-curve did not converge; statistically unreachable.
    #[error("hash to curve exhausted its counter space")]
    HashToCurveExhausted,
    /// Amount key for the requested denomination is unknown
    #[error("no key for amount in keyset")]
    AmountKeyNotFound,
}

/// Maps an arbitrary message onto a valid secp256k1 curve point using the
/// Cashu domain-separated try-and-increment construction (NUT-00).
pub fn hash_to_curve(message: &[u8]) -> Result<PublicKey, Error> {
    let msg_to_hash = [DOMAIN_SEPARATOR.as_slice(), message].concat();
    let mut hash = sha256::Hash::hash(&msg_to_hash).to_byte_array();

    for counter in 0_u32.. {
        let mut to_hash = hash.to_vec();
        to_hash.extend_from_slice(&counter.to_le_bytes());
        let candidate = sha256::Hash::hash(&to_hash).to_byte_array();

        let mut compressed = [0x02_u8; 33];
        compressed[1..].copy_from_slice(&candidate);

        if let Ok(point) = Secp256k1PublicKey::from_slice(&compressed) {
            return Ok(point.into());
        }

        hash = candidate;
    }

    Err(Error::HashToCurveExhausted)
}

/// Blind a secret message: Alice's step 1.
///
/// `Y = hash_to_curve(secret)`, `B_ = Y + r·G` for a freshly drawn (or
/// caller-supplied, for deterministic derivation) blinding factor `r`.
pub fn blind_message(
    secret: &[u8],
    blinding_factor: Option<SecretKey>,
) -> Result<(PublicKey, SecretKey), Error> {
    let y = hash_to_curve(secret)?;

    let r = match blinding_factor {
        Some(r) => r,
        None => SecretKey::generate(),
    };

    let b: Secp256k1PublicKey = y.add_exp_tweak(&SECP256K1, &r.as_scalar())?;

    Ok((b.into(), r))
}

/// Unblind a mint's blind signature: Alice's step 3.
///
/// `C = C_ − r·K` for the mint's per-amount public key `K`.
pub fn unblind_message(
    blinded_key: &PublicKey,
    r: &SecretKey,
    mint_pubkey: &PublicKey,
) -> Result<PublicKey, Error> {
    let rk: Secp256k1PublicKey = mint_pubkey.add_exp_tweak(&SECP256K1, &r.as_scalar())?;
    let c: Secp256k1PublicKey = blinded_key.combine(&rk.negate(&SECP256K1))?;
    Ok(c.into())
}

/// Reconstruct spendable [`crate::nuts::nut00::Proof`]s from the mint's
/// blind signatures, the blinding factors used and the original secrets.
#[cfg(feature = "wallet")]
pub fn construct_proofs(
    promises: Vec<crate::nuts::nut00::BlindSignature>,
    rs: Vec<SecretKey>,
    secrets: Vec<crate::secret::Secret>,
    keys: &crate::nuts::nut01::Keys,
) -> Result<crate::nuts::nut00::Proofs, Error> {
    let mut proofs = Vec::with_capacity(promises.len());

    for ((promise, r), secret) in promises.into_iter().zip(rs).zip(secrets) {
        let amount_key = keys
            .amount_key(promise.amount)
            .ok_or(Error::AmountKeyNotFound)?;
        let c = unblind_message(&promise.c, &r, amount_key)?;

        let dleq = promise
            .dleq
            .map(|dleq| crate::nuts::nut12::ProofDleq::from_blind_signature(dleq, r.clone()));

        proofs.push(crate::nuts::nut00::Proof {
            amount: promise.amount,
            keyset_id: promise.keyset_id,
            secret,
            c,
            witness: None,
            dleq,
        });
    }

    Ok(proofs)
}

/// Mint-side signing: `C_ = k·B_` for the keyset's private amount-key `k`.
#[cfg(feature = "mint")]
pub fn sign_message(a: &SecretKey, blinded_message: &PublicKey) -> Result<PublicKey, Error> {
    let signed: Secp256k1PublicKey = blinded_message.mul_tweak(&SECP256K1, &a.as_scalar())?;
    Ok(signed.into())
}

/// Mint-side verification that an unblinded signature `C` was produced with
/// private key `a` over `secret`: checks `C == a·hash_to_curve(secret)`.
#[cfg(feature = "mint")]
pub fn verify_message(
    a: &SecretKey,
    unblinded_message: &PublicKey,
    secret: &[u8],
) -> Result<bool, Error> {
    let y = hash_to_curve(secret)?;
    let expected: Secp256k1PublicKey = y.mul_tweak(&SECP256K1, &a.as_scalar())?;
    Ok(*unblinded_message == PublicKey::from(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_to_curve() {
        let secret = hex_decode("0000000000000000000000000000000000000000000000000000000000000000");
        let y = hash_to_curve(&secret).unwrap();
        let expected = PublicKey::from_hex(
            "02c03ade6f7345a213ea11acde3fda8514f2b7d836a32dfac38f9596c07258f9a9",
        )
        .unwrap();
        assert_eq!(y, expected);

        let secret = hex_decode("0000000000000000000000000000000000000000000000000000000000000001");
        let y = hash_to_curve(&secret).unwrap();
        let expected = PublicKey::from_hex(
            "02a5525df57a880f880f28903f32b421df848b3dc1d2cf0bf3d718d7bd772c2df9",
        )
        .unwrap();
        assert_eq!(y, expected);
    }

    #[test]
    fn test_blind_unblind_round_trip() {
        // BDHKE happy path.
        let secret = b"test_message";
        let k = SecretKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let mint_pubkey = k.public_key();

        let (blinded, r) = blind_message(secret, None).unwrap();
        let c_: Secp256k1PublicKey = blinded.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap();
        let c = unblind_message(&c_.into(), &r, &mint_pubkey).unwrap();

        let y = hash_to_curve(secret).unwrap();
        let expected: Secp256k1PublicKey = y.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap();
        assert_eq!(c, PublicKey::from(expected));
    }

    fn hex_decode(s: &str) -> Vec<u8> {
        crate::util::hex::decode(s).unwrap()
    }
}
