//! Cashu NUTs implemented by this crate
//!
//! See all at <https://github.com/cashubtc/nuts>

pub mod nut00;
pub mod nut01;
pub mod nut02;
pub mod nut10;
pub mod nut11;
pub mod nut12;
#[cfg(feature = "wallet")]
pub mod nut13;
pub mod nut14;

pub use nut00::{
    BlindSignature, BlindedMessage, CurrencyUnit, PaymentMethod, Proof, Proofs, ProofsMethods,
    Token, TokenV3, TokenV4, Witness,
};
#[cfg(feature = "wallet")]
pub use nut00::{PreMint, PreMintSecrets};
pub use nut01::{Keys, KeysResponse, PublicKey, SecretKey};
#[cfg(feature = "mint")]
pub use nut02::mint::MintKeySet;
pub use nut02::{diff_keysets, Id, KeySet, KeySetInfo, KeysetResponse, KeysetSyncDelta};
pub use nut10::{Kind as Nut10Kind, Secret as Nut10Secret, SecretData as Nut10SecretData};
pub use nut11::{
    enforce_sig_flag, sig_all_message, valid_signatures, Conditions, EnforceSigFlag, P2PKWitness,
    SigFlag, SpendingConditions, Tag, TagKind,
};
pub use nut12::{BlindSignatureDleq, ProofDleq};
pub use nut14::HTLCWitness;
