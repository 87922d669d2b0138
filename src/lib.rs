#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

//! Core Cashu ecash wallet primitives: BDHKE blind signing, DLEQ proofs,
//! P2PK/HTLC spending conditions, keyset management, token encoding,
//! deterministic secret derivation and the wallet orchestrator state
//! machines built on top of them.

pub mod amount;
pub mod dhke;
pub mod mint_url;
pub mod nuts;
pub mod secret;
pub mod util;
#[cfg(feature = "wallet")]
pub mod wallet;

pub use self::amount::Amount;
pub use self::mint_url::MintUrl;
pub use self::nuts::*;
pub use self::util::SECP256K1;

#[doc(hidden)]
#[macro_export]
macro_rules! ensure_wallet {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
