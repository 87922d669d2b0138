//! NUT-12: Offline ecash signature verification (DLEQ proofs)
//!
//! <https://github.com/cashubtc/nuts/blob/main/12.md>
//!
//! Lets a wallet verify a mint's blind signature without contacting the
//! mint, by carrying along a Schnorr-style proof that `C_ = k * B_` for the
//! same `k` whose public half `A` the mint already publishes.

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::PublicKey as Secp256k1PublicKey;
use bitcoin::secp256k1::Scalar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nuts::nut01::{PublicKey, SecretKey};
use crate::secret::Secret;
use crate::util::SECP256K1;

/// NUT-12 errors
#[derive(Debug, Error)]
pub enum Error {
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// DHKE error (hash-to-curve of the proof secret)
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
}

/// `(e, s)` DLEQ proof a mint attaches to a [`BlindSignature`](crate::nuts::nut00::BlindSignature).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignatureDleq {
    /// Challenge scalar
    pub e: SecretKey,
    /// Response scalar
    pub s: SecretKey,
}

/// `(e, s, r)` DLEQ proof carried on a redeemed [`Proof`](crate::nuts::nut00::Proof).
///
/// `r` is the blinding factor the wallet used to produce the original blind
/// signature; it lets whoever verifies the spent proof reconstruct `B_` and
/// `C_` from the unblinded `(secret, C)` pair alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDleq {
    /// Challenge scalar
    pub e: SecretKey,
    /// Response scalar
    pub s: SecretKey,
    /// Blinding factor used when the proof's signature was requested
    pub r: SecretKey,
}

impl ProofDleq {
    /// Carry a mint's [`BlindSignatureDleq`] forward onto the unblinded
    /// proof, recording the blinding factor `r` alongside it.
    pub fn from_blind_signature(dleq: BlindSignatureDleq, r: SecretKey) -> Self {
        Self {
            e: dleq.e,
            s: dleq.s,
            r,
        }
    }
}

/// Fiat-Shamir challenge: `e = hash(R1 || R2 || A || C_)`, reduced onto the
/// scalar field by rejection (retrying the hash is astronomically
/// unlikely to be needed, but is the only correct behaviour if it is).
fn hash_e(points: [&PublicKey; 4]) -> Result<SecretKey, Error> {
    let mut bytes = Vec::with_capacity(65 * 4);
    for point in points {
        bytes.extend_from_slice(&point.to_uncompressed_bytes());
    }

    let mut digest = Sha256Hash::hash(&bytes).to_byte_array();
    loop {
        match SecretKey::from_slice(&digest) {
            Ok(e) => return Ok(e),
            Err(_) => digest = Sha256Hash::hash(&digest).to_byte_array(),
        }
    }
}

/// Mint-side: prove that `c_ = k * blinded_secret` for the same `k` behind
/// `A = k * G`, without revealing `k`.
pub fn prove(k: &SecretKey, blinded_secret: &PublicKey, c_: &PublicKey) -> Result<BlindSignatureDleq, Error> {
    let mint_pubkey = k.public_key();

    let nonce = SecretKey::generate();
    let r1 = nonce.public_key();
    let r2: Secp256k1PublicKey = blinded_secret.mul_tweak(&SECP256K1, &nonce.as_scalar())?;
    let r2: PublicKey = r2.into();

    let e = hash_e([&r1, &r2, &mint_pubkey, c_])?;
    let ke = k.mul_tweak(&e.as_scalar())?;
    let s: SecretKey = nonce.add_tweak(&Scalar::from(ke))?.into();

    Ok(BlindSignatureDleq { e, s })
}

/// `s*G - e*A`
fn s_g_minus_e_a(s: &SecretKey, e: &SecretKey, a: &PublicKey) -> Result<PublicKey, Error> {
    let s_g = s.public_key();
    let e_a: Secp256k1PublicKey = a.mul_tweak(&SECP256K1, &e.as_scalar())?;
    let combined: Secp256k1PublicKey = s_g.combine(&e_a.negate(&SECP256K1))?;
    Ok(combined.into())
}

/// `s*point - e*other`
fn s_point_minus_e_other(
    s: &SecretKey,
    point: &PublicKey,
    e: &SecretKey,
    other: &PublicKey,
) -> Result<PublicKey, Error> {
    let s_point: Secp256k1PublicKey = point.mul_tweak(&SECP256K1, &s.as_scalar())?;
    let e_other: Secp256k1PublicKey = other.mul_tweak(&SECP256K1, &e.as_scalar())?;
    let combined: Secp256k1PublicKey = s_point.combine(&e_other.negate(&SECP256K1))?;
    Ok(combined.into())
}

/// Wallet-side: check a mint's [`BlindSignatureDleq`] against the blinded
/// message and signature it was supposed to cover.
pub fn verify_alice(
    blinded_secret: &PublicKey,
    c_: &PublicKey,
    dleq: &BlindSignatureDleq,
    mint_pubkey: &PublicKey,
) -> Result<bool, Error> {
    let r1 = s_g_minus_e_a(&dleq.s, &dleq.e, mint_pubkey)?;
    let r2 = s_point_minus_e_other(&dleq.s, blinded_secret, &dleq.e, c_)?;
    let recomputed = hash_e([&r1, &r2, mint_pubkey, c_])?;
    Ok(recomputed.to_secret_bytes() == dleq.e.to_secret_bytes())
}

/// Verify a redeemed proof's DLEQ, reconstructing `B_`/`C_` from the
/// unblinded `(secret, C)` pair and the stored blinding factor `r`.
pub fn verify_carol(
    secret: &Secret,
    c: &PublicKey,
    dleq: &ProofDleq,
    mint_pubkey: &PublicKey,
) -> Result<bool, Error> {
    let y = crate::dhke::hash_to_curve(secret.as_bytes())?;
    let b_tmp: Secp256k1PublicKey = y.add_exp_tweak(&SECP256K1, &dleq.r.as_scalar())?;
    let b_: PublicKey = b_tmp.into();
    let r_a: Secp256k1PublicKey = mint_pubkey.mul_tweak(&SECP256K1, &dleq.r.as_scalar())?;
    let c_tmp: Secp256k1PublicKey = c.combine(&r_a)?;
    let c_: PublicKey = c_tmp.into();

    verify_alice(
        &b_,
        &c_,
        &BlindSignatureDleq {
            e: dleq.e.clone(),
            s: dleq.s.clone(),
        },
        mint_pubkey,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhke::blind_message;

    #[test]
    fn test_dleq_round_trip_alice() {
        let k = SecretKey::generate();
        let mint_pubkey = k.public_key();

        let secret = Secret::generate();
        let (blinded_secret, _r) = blind_message(secret.as_bytes(), None).unwrap();
        let c_: PublicKey = blinded_secret.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap().into();

        let dleq = prove(&k, &blinded_secret, &c_).unwrap();
        assert!(verify_alice(&blinded_secret, &c_, &dleq, &mint_pubkey).unwrap());
    }

    #[test]
    fn test_dleq_round_trip_carol() {
        let k = SecretKey::generate();
        let mint_pubkey = k.public_key();

        let secret = Secret::generate();
        let (blinded_secret, r) = blind_message(secret.as_bytes(), None).unwrap();
        let c_: PublicKey = blinded_secret.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap().into();
        let c = crate::dhke::unblind_message(&c_, &r, &mint_pubkey).unwrap();

        let dleq = prove(&k, &blinded_secret, &c_).unwrap();
        let proof_dleq = ProofDleq::from_blind_signature(dleq, r);

        assert!(verify_carol(&secret, &c, &proof_dleq, &mint_pubkey).unwrap());
    }

    #[test]
    fn test_dleq_rejects_wrong_key() {
        let k = SecretKey::generate();
        let other = SecretKey::generate();

        let secret = Secret::generate();
        let (blinded_secret, _r) = blind_message(secret.as_bytes(), None).unwrap();
        let c_: PublicKey = blinded_secret.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap().into();

        let dleq = prove(&k, &blinded_secret, &c_).unwrap();
        assert!(!verify_alice(&blinded_secret, &c_, &dleq, &other.public_key()).unwrap());
    }
}
