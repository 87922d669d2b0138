//! NUT-13: Deterministic Secrets
//!
//! <https://github.com/cashubtc/nuts/blob/main/13.md>
//!
//! Lets a wallet regenerate every secret and blinding factor it has ever
//! used from a single BIP-39 seed, so a lost database can be rebuilt by
//! rescanning a mint's keysets rather than needing its own backup.

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::Network;
use thiserror::Error;
use tracing::instrument;

use super::nut00::{BlindedMessage, PreMint, PreMintSecrets};
use super::nut01::SecretKey;
use super::nut02::Id;
use crate::dhke::blind_message;
use crate::secret::Secret;
use crate::util::hex;
use crate::{Amount, SECP256K1};

/// NUT-13 errors
#[derive(Debug, Error)]
pub enum Error {
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// BIP-32 derivation error
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
}

/// The shared `m/129372'/0'/<keyset>'` prefix every deterministic secret
/// and blinding factor is derived under. The keyset id is folded onto a
/// BIP-32 hardened index by reducing its big-endian integer value modulo
/// `2^31 - 1`, since a hardened index must fit in 31 bits.
fn derive_path_from_keyset_id(id: Id) -> Result<DerivationPath, Error> {
    let keyset_index = (u64::try_from(id).unwrap_or(0) % ((1u64 << 31) - 1)) as u32;

    Ok(DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(129372)?,
        ChildNumber::from_hardened_idx(0)?,
        ChildNumber::from_hardened_idx(keyset_index)?,
    ]))
}

impl Secret {
    /// Derive the secret used at `counter` for outputs against `keyset_id`,
    /// from a BIP-39 seed: `m/129372'/0'/<keyset>'/<counter>'/0`.
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        let xpriv = Xpriv::new_master(Network::Bitcoin, seed)?;
        let path = derive_path_from_keyset_id(keyset_id)?
            .child(ChildNumber::from_hardened_idx(counter)?)
            .child(ChildNumber::from_normal_idx(0)?);
        let derived = xpriv.derive_priv(&SECP256K1, &path)?;

        Ok(Self::new(hex::encode(derived.private_key.secret_bytes())))
    }
}

impl SecretKey {
    /// Derive the blinding factor used at `counter` for outputs against
    /// `keyset_id`, from a BIP-39 seed: `m/129372'/0'/<keyset>'/<counter>'/1`.
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        let xpriv = Xpriv::new_master(Network::Bitcoin, seed)?;
        let path = derive_path_from_keyset_id(keyset_id)?
            .child(ChildNumber::from_hardened_idx(counter)?)
            .child(ChildNumber::from_normal_idx(1)?);
        let derived = xpriv.derive_priv(&SECP256K1, &path)?;

        Ok(Self::from(derived.private_key))
    }
}

impl PreMintSecrets {
    /// Deterministically derive blinded outputs for `amounts`, walking the
    /// counter forward by one per output starting at `counter`.
    #[instrument(skip(seed))]
    pub fn from_seed(
        keyset_id: Id,
        counter: u32,
        seed: &[u8; 64],
        amounts: &[Amount],
    ) -> Result<Self, Error> {
        let mut secrets = Vec::with_capacity(amounts.len());
        let mut blinded_messages = Vec::with_capacity(amounts.len());
        let mut counter = counter;

        for &amount in amounts {
            let secret = Secret::from_seed(seed, keyset_id, counter)?;
            let blinding_factor = SecretKey::from_seed(seed, keyset_id, counter)?;
            let (blinded_secret, r) = blind_message(secret.as_bytes(), Some(blinding_factor))?;

            blinded_messages.push(BlindedMessage {
                amount,
                keyset_id,
                blinded_secret,
                witness: None,
            });
            secrets.push(PreMint {
                secret,
                blinding_factor: r,
                amount,
                count: Some(counter),
            });

            counter += 1;
        }

        Ok(Self {
            keyset_id: Some(keyset_id),
            secrets,
            blinded_messages,
        })
    }

    /// Regenerate the outputs for a contiguous counter range, used to
    /// rescan a keyset for proofs a wallet may have lost track of.
    pub fn restore_batch(
        keyset_id: Id,
        seed: &[u8; 64],
        start_count: u32,
        end_count: u32,
    ) -> Result<Self, Error> {
        let amounts = vec![Amount::ZERO; (end_count - start_count + 1) as usize];
        Self::from_seed(keyset_id, start_count, seed, &amounts)
    }
}
