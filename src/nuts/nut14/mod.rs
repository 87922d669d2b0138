//! NUT-14: Hashed Time Lock Contracts (HTLC)
//!
//! <https://github.com/cashubtc/nuts/blob/main/14.md>

use std::str::FromStr;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::schnorr::Signature;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::nut00::{Proof, Witness};
use super::nut10::{Kind, Secret};
use super::nut11::{valid_signatures, Conditions};
use crate::util::{hex, unix_time};

pub mod serde_htlc_witness;

/// NUT-14 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Secret is not an HTLC secret
    #[error("secret is not a htlc secret")]
    IncorrectSecretKind,
    /// HTLC locktime has already passed
    #[error("locktime in past")]
    LocktimeInPast,
    /// Payment hash missing from secret data
    #[error("hash required")]
    HashRequired,
    /// Payment hash does not parse
    #[error("invalid hash")]
    InvalidHash,
    /// Preimage does not hash to the locked payment hash
    #[error("preimage does not match")]
    Preimage,
    /// Witness signatures not provided
    #[error("witness did not provide signatures")]
    SignaturesNotProvided,
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// NUT-11 error
    #[error(transparent)]
    Nut11(#[from] super::nut11::Error),
    /// Serde error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// NUT-10 error
    #[error(transparent)]
    Nut10(#[from] crate::nuts::nut10::Error),
}

/// HTLC witness: the preimage unlocking the payment hash, plus any pubkey
/// signatures the spending condition additionally requires.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HTLCWitness {
    /// Preimage, hex-encoded
    pub preimage: String,
    /// Signatures, hex-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<String>>,
}

impl Proof {
    /// Verify the HTLC spending condition on this proof's secret.
    pub fn verify_htlc(&self) -> Result<(), Error> {
        let secret: Secret = self.secret.clone().try_into()?;
        if secret.kind() != Kind::HTLC {
            return Err(Error::IncorrectSecretKind);
        }

        let conditions: Option<Conditions> = secret
            .secret_data()
            .tags()
            .and_then(|tags| tags.clone().try_into().ok());

        let htlc_witness = match &self.witness {
            Some(Witness::HTLCWitness(witness)) => witness,
            _ => return Err(Error::SignaturesNotProvided),
        };

        if let Some(conditions) = conditions {
            if let Some(locktime) = conditions.locktime {
                if unix_time() >= locktime {
                    return match conditions.refund_keys {
                        None => Ok(()),
                        Some(refund_keys) => {
                            let signatures = self
                                .witness
                                .as_ref()
                                .and_then(Witness::signatures)
                                .ok_or(Error::SignaturesNotProvided)?
                                .iter()
                                .map(|s| Signature::from_str(s))
                                .collect::<Result<Vec<Signature>, _>>()?;

                            let needed = conditions.num_sigs_refund.unwrap_or(1);
                            if valid_signatures(self.secret.as_bytes(), &refund_keys, &signatures)? >= needed {
                                Ok(())
                            } else {
                                Err(Error::SignaturesNotProvided)
                            }
                        }
                    };
                }
            }

            if let Some(pubkeys) = conditions.pubkeys {
                let req_sigs = conditions.num_sigs.unwrap_or(1);
                let signatures = htlc_witness
                    .signatures
                    .as_ref()
                    .ok_or(Error::SignaturesNotProvided)?
                    .iter()
                    .map(|s| Signature::from_str(s))
                    .collect::<Result<Vec<Signature>, _>>()?;

                if valid_signatures(self.secret.as_bytes(), &pubkeys, &signatures)? < req_sigs {
                    return Err(Error::SignaturesNotProvided);
                }
            }
        }

        let hash_lock =
            Sha256Hash::from_str(secret.secret_data().data()).map_err(|_| Error::InvalidHash)?;
        let preimage_bytes = hex::decode(&htlc_witness.preimage).map_err(|_| Error::InvalidHash)?;
        let preimage_hash = Sha256Hash::hash(&preimage_bytes);

        if hash_lock != preimage_hash {
            return Err(Error::Preimage);
        }

        Ok(())
    }

    /// Attach the preimage unlocking an HTLC secret, keeping any signatures
    /// already present on the proof's witness.
    pub fn add_preimage(&mut self, preimage: String) {
        let signatures = self.witness.as_ref().and_then(Witness::signatures);
        self.witness = Some(Witness::HTLCWitness(HTLCWitness { preimage, signatures }));
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::nut01::SecretKey;
    use crate::nuts::nut02::Id;
    use crate::nuts::nut10::{Kind as Nut10Kind, Secret as Nut10Secret};
    use crate::util::hex;
    use crate::Amount;

    fn htlc_proof(preimage: &[u8; 32], conditions: Option<Conditions>) -> (Proof, SecretKey) {
        let hash = Sha256Hash::hash(preimage);
        let secret_key = SecretKey::generate();

        let nut10 = Nut10Secret::new(Nut10Kind::HTLC, hash.to_string(), conditions);
        let secret: crate::secret::Secret = nut10.try_into().unwrap();

        let proof = Proof::new(
            Amount::from(1),
            Id::from_str("009a1f293253e41e").unwrap(),
            secret,
            secret_key.public_key(),
        );
        (proof, secret_key)
    }

    #[test]
    fn test_htlc_valid_preimage() {
        let preimage = [7u8; 32];
        let (mut proof, _) = htlc_proof(&preimage, None);
        proof.add_preimage(hex::encode(preimage));
        assert!(proof.verify_htlc().is_ok());
    }

    #[test]
    fn test_htlc_wrong_preimage_fails() {
        let preimage = [7u8; 32];
        let (mut proof, _) = htlc_proof(&preimage, None);
        proof.add_preimage(hex::encode([8u8; 32]));
        assert!(proof.verify_htlc().is_err());
    }

    #[test]
    fn test_htlc_requires_pubkey_signature() {
        let preimage = [7u8; 32];
        let signer = SecretKey::generate();
        let conditions =
            Conditions::new(None, Some(vec![signer.public_key()]), None, Some(1), None, None).unwrap();
        let (mut proof, _) = htlc_proof(&preimage, Some(conditions));
        proof.add_preimage(hex::encode(preimage));
        assert!(proof.verify_htlc().is_err());

        proof.sign_p2pk(signer).unwrap();
        assert!(proof.verify_htlc().is_ok());
    }
}
