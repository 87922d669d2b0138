//! Cashu token envelope: the portable, offline-transferable bearer object
//! defined by NUT-00's token format.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bitcoin::base64::engine::{general_purpose, GeneralPurpose};
use bitcoin::base64::{alphabet, Engine as _};
use serde::{Deserialize, Serialize};

use super::{CurrencyUnit, Error, Proof, Proofs};
use crate::mint_url::MintUrl;
use crate::nuts::nut02::Id;
use crate::Amount;

const V3_PREFIX: &str = "cashuA";
const V4_PREFIX: &str = "cashuB";

fn url_safe_decode(s: &str) -> Result<Vec<u8>, Error> {
    let config = general_purpose::GeneralPurposeConfig::new()
        .with_decode_padding_mode(bitcoin::base64::engine::DecodePaddingMode::Indifferent);
    Ok(GeneralPurpose::new(&alphabet::URL_SAFE, config).decode(s)?)
}

/// A portable token, either the legacy JSON (`cashuA`) or CBOR (`cashuB`)
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// Legacy JSON envelope
    TokenV3(TokenV3),
    /// Compact CBOR envelope
    TokenV4(TokenV4),
}

impl Token {
    /// Build the (preferred) V4 envelope for a set of proofs from a single
    /// mint, grouping them by keyset id.
    pub fn new(mint_url: MintUrl, proofs: Proofs, memo: Option<String>, unit: CurrencyUnit) -> Self {
        Token::TokenV4(TokenV4::new(mint_url, proofs, memo, unit))
    }

    /// Total value across all proofs, rejecting duplicates.
    pub fn value(&self) -> Result<Amount, Error> {
        match self {
            Self::TokenV3(t) => t.value(),
            Self::TokenV4(t) => t.value(),
        }
    }

    /// Flatten back into a plain proof list.
    pub fn proofs(&self) -> Proofs {
        match self {
            Self::TokenV3(t) => t.proofs(),
            Self::TokenV4(t) => t.proofs(),
        }
    }

    /// Memo attached at creation time, if any.
    pub fn memo(&self) -> &Option<String> {
        match self {
            Self::TokenV3(t) => &t.memo,
            Self::TokenV4(t) => &t.memo,
        }
    }

    /// Currency unit, when the envelope carries one.
    pub fn unit(&self) -> Option<CurrencyUnit> {
        match self {
            Self::TokenV3(t) => t.unit.clone(),
            Self::TokenV4(t) => Some(t.unit.clone()),
        }
    }

    /// The single mint this token's proofs were issued by.
    pub fn mint_url(&self) -> Result<MintUrl, Error> {
        match self {
            Self::TokenV3(t) => {
                let urls = t.mint_urls();
                if urls.len() != 1 {
                    return Err(Error::UnsupportedToken);
                }
                Ok(urls[0].clone())
            }
            Self::TokenV4(t) => Ok(t.mint_url.clone()),
        }
    }

    /// Re-encode as the legacy V3 string form, e.g. for an older mint.
    pub fn to_v3_string(&self) -> String {
        match self {
            Self::TokenV3(t) => t.to_string(),
            Self::TokenV4(t) => TokenV3::from(t.clone()).to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenV3(t) => write!(f, "{t}"),
            Self::TokenV4(t) => write!(f, "{t}"),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(V3_PREFIX) {
            Ok(Token::TokenV3(TokenV3::from_str(s)?))
        } else if s.starts_with(V4_PREFIX) {
            Ok(Token::TokenV4(TokenV4::from_str(s)?))
        } else {
            Err(Error::UnknownTokenVersion)
        }
    }
}

/// One mint's share of a V3 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3Token {
    /// Mint that issued `proofs`
    pub mint: MintUrl,
    /// Proofs from that mint
    pub proofs: Proofs,
}

/// Legacy JSON/base64 token envelope (`cashuA...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3 {
    /// Proofs, grouped by mint (multi-mint tokens are parsed but rejected
    /// by [`TokenV3::mint_urls`] callers that require a single mint)
    pub token: Vec<TokenV3Token>,
    /// Optional human-readable memo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Currency unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<CurrencyUnit>,
}

impl TokenV3 {
    /// Build a single-mint V3 token.
    pub fn new(mint_url: MintUrl, proofs: Proofs, memo: Option<String>, unit: Option<CurrencyUnit>) -> Result<Self, Error> {
        if proofs.is_empty() {
            return Err(Error::ProofsRequired);
        }
        Ok(Self {
            token: vec![TokenV3Token { mint: mint_url, proofs }],
            memo,
            unit,
        })
    }

    /// Flatten proofs across all mint groups.
    pub fn proofs(&self) -> Proofs {
        self.token.iter().flat_map(|t| t.proofs.clone()).collect()
    }

    /// Sum of all proof amounts, rejecting duplicate proofs.
    pub fn value(&self) -> Result<Amount, Error> {
        let proofs = self.proofs();
        let unique: std::collections::HashSet<_> = proofs.iter().map(|p| (p.keyset_id, p.secret.clone())).collect();
        if unique.len() != proofs.len() {
            return Err(Error::UnsupportedToken);
        }
        Amount::try_sum(proofs.iter().map(|p| p.amount)).map_err(Into::into)
    }

    /// Mint URLs this token draws proofs from, one per group.
    pub fn mint_urls(&self) -> Vec<MintUrl> {
        self.token.iter().map(|t| t.mint.clone()).collect()
    }

    /// Whether this token's proofs come from more than one mint; such
    /// tokens cannot be redeemed as a single swap.
    pub fn is_multi_mint(&self) -> bool {
        self.token.len() > 1
    }
}

impl fmt::Display for TokenV3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{V3_PREFIX}{}", general_purpose::URL_SAFE.encode(json))
    }
}

impl FromStr for TokenV3 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(V3_PREFIX).ok_or(Error::UnknownTokenVersion)?;
        let decoded = url_safe_decode(body)?;
        Ok(serde_json::from_slice(&decoded)?)
    }
}

/// One keyset's share of a V4 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4Token {
    /// Keyset id shared by every proof in `proofs`
    #[serde(rename = "i")]
    pub keyset_id: Id,
    /// Proofs, with their (redundant, per-group) keyset id stripped
    #[serde(rename = "p")]
    pub proofs: Vec<CompactProof>,
}

/// A [`Proof`] without its keyset id, used inside a [`TokenV4Token`] group
/// where the id is already carried once at the group level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactProof {
    #[serde(rename = "a")]
    amount: Amount,
    #[serde(rename = "s")]
    secret: crate::secret::Secret,
    #[serde(rename = "c")]
    c: crate::nuts::nut01::PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "w")]
    witness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "d")]
    dleq: Option<crate::nuts::nut12::ProofDleq>,
}

impl From<Proof> for CompactProof {
    fn from(p: Proof) -> Self {
        Self {
            amount: p.amount,
            secret: p.secret,
            c: p.c,
            witness: p.witness.map(|w| serde_json::to_string(&w).unwrap_or_default()),
            dleq: p.dleq,
        }
    }
}

impl CompactProof {
    fn into_proof(self, keyset_id: Id) -> Proof {
        let witness = self
            .witness
            .and_then(|w| serde_json::from_str(&w).ok());
        Proof {
            amount: self.amount,
            keyset_id,
            secret: self.secret,
            c: self.c,
            witness,
            dleq: self.dleq,
        }
    }
}

/// Compact CBOR/base64 token envelope (`cashuB...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4 {
    /// Mint url
    #[serde(rename = "m")]
    pub mint_url: MintUrl,
    /// Currency unit
    #[serde(rename = "u")]
    pub unit: CurrencyUnit,
    /// Optional memo
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Proofs grouped by keyset id
    #[serde(rename = "t")]
    pub token: Vec<TokenV4Token>,
}

impl TokenV4 {
    /// Group `proofs` by keyset id into a new V4 envelope.
    pub fn new(mint_url: MintUrl, proofs: Proofs, memo: Option<String>, unit: CurrencyUnit) -> Self {
        let mut groups: HashMap<Id, Vec<CompactProof>> = HashMap::new();
        for proof in proofs {
            let id = proof.keyset_id;
            groups.entry(id).or_default().push(proof.into());
        }

        let token = groups
            .into_iter()
            .map(|(keyset_id, proofs)| TokenV4Token { keyset_id, proofs })
            .collect();

        Self { mint_url, unit, memo, token }
    }

    /// Flatten proofs back out, re-attaching each group's keyset id.
    pub fn proofs(&self) -> Proofs {
        self.token
            .iter()
            .flat_map(|group| group.proofs.iter().cloned().map(|p| p.into_proof(group.keyset_id)))
            .collect()
    }

    /// Sum of all proof amounts, rejecting duplicate proofs.
    pub fn value(&self) -> Result<Amount, Error> {
        let proofs = self.proofs();
        let unique: std::collections::HashSet<_> = proofs.iter().map(|p| (p.keyset_id, p.secret.clone())).collect();
        if unique.len() != proofs.len() {
            return Err(Error::UnsupportedToken);
        }
        Amount::try_sum(proofs.iter().map(|p| p.amount)).map_err(Into::into)
    }

    /// Serialize to the raw CBOR bytes, without base64/prefix framing.
    pub fn to_raw_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        ciborium::into_writer(self, &mut data)?;
        Ok(data)
    }
}

impl fmt::Display for TokenV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_raw_bytes().map_err(|_| fmt::Error)?;
        write!(f, "{V4_PREFIX}{}", general_purpose::URL_SAFE.encode(data))
    }
}

impl FromStr for TokenV4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(V4_PREFIX).ok_or(Error::UnknownTokenVersion)?;
        let decoded = url_safe_decode(body)?;
        Ok(ciborium::from_reader(&decoded[..])?)
    }
}

impl From<TokenV4> for TokenV3 {
    fn from(token: TokenV4) -> Self {
        let proofs = token.proofs();
        TokenV3 {
            token: vec![TokenV3Token {
                mint: token.mint_url,
                proofs,
            }],
            memo: token.memo,
            unit: Some(token.unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::nut01::PublicKey;
    use crate::secret::Secret;

    fn sample_proofs() -> (Id, Proofs) {
        let id = Id::from_str("009a1f293253e41e").unwrap();
        let c = PublicKey::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104").unwrap();
        (
            id,
            vec![
                Proof::new(Amount::from(2), id, Secret::generate(), c),
                Proof::new(Amount::from(8), id, Secret::generate(), c),
            ],
        )
    }

    #[test]
    fn test_token_v3_string_round_trip() {
        let (_, proofs) = sample_proofs();
        let mint_url = MintUrl::from_str("https://8333.space:3338").unwrap();
        let token = TokenV3::new(mint_url, proofs, Some("thanks".to_string()), Some(CurrencyUnit::Sat)).unwrap();

        let encoded = token.to_string();
        assert!(encoded.starts_with(V3_PREFIX));

        let decoded = TokenV3::from_str(&encoded).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_token_v4_string_round_trip() {
        let (_, proofs) = sample_proofs();
        let mint_url = MintUrl::from_str("https://8333.space:3338").unwrap();
        let token = TokenV4::new(mint_url, proofs.clone(), None, CurrencyUnit::Sat);

        let encoded = token.to_string();
        assert!(encoded.starts_with(V4_PREFIX));

        let decoded = TokenV4::from_str(&encoded).unwrap();
        let mut decoded_proofs = decoded.proofs();
        let mut original_proofs = proofs;
        decoded_proofs.sort_by_key(|p| p.amount);
        original_proofs.sort_by_key(|p| p.amount);
        assert_eq!(decoded_proofs, original_proofs);
    }

    #[test]
    fn test_token_rejects_unknown_prefix() {
        assert!(Token::from_str("cashuZdeadbeef").is_err());
    }

    #[test]
    fn test_token_v3_value_rejects_duplicates() {
        let (id, _) = sample_proofs();
        let c = PublicKey::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104").unwrap();
        let secret = Secret::generate();
        let proof = Proof::new(Amount::from(4), id, secret, c);
        let mint_url = MintUrl::from_str("https://example.com").unwrap();
        let token = TokenV3::new(mint_url, vec![proof.clone(), proof], None, None).unwrap();

        assert!(token.value().is_err());
    }
}
