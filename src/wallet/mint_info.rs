//! Mint capability advertisement (`MintInfo`).
//!
//! Consumed read-only; the wallet never constructs one itself. Per-NUT
//! settings are free-form JSON on the wire, so they're represented as a
//! tagged-union [`NutValue`] rather than re-parsed `serde_json::Value`
//! sprinkled through the rest of the crate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::nuts::PublicKey;

/// A JSON value restricted to the shapes a mint's `nuts` settings map
/// actually uses, so downstream consumers pattern-match instead of
/// threading `serde_json::Value` through the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutValue {
    /// `true`/`false`
    Bool(bool),
    /// A signed integer setting (e.g. a NUT-05 minimum amount)
    Int(i64),
    /// A bare string setting
    String(String),
    /// A nested settings object, e.g. `{"methods": [...], "disabled": false}`
    Object(HashMap<String, NutValue>),
    /// A list, e.g. NUT-04's `[["bolt11", "sat"]]` method/unit pairs
    Array(Vec<NutValue>),
    /// `null`
    Null,
}

/// `name/version` pair advertised by a mint implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintVersion {
    /// Implementation name
    pub name: String,
    /// Implementation version string
    pub version: String,
}

/// Capability advertisement returned by a mint's info endpoint (NUT-06).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintInfo {
    /// Human-readable mint name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The mint's identity public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    /// Implementation and version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<MintVersion>,
    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Long-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_long: Option<String>,
    /// Per-NUT settings, keyed by NUT number
    pub nuts: HashMap<u16, NutValue>,
    /// Message of the day the wallet should display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
}

impl MintInfo {
    /// Settings the mint advertises for a given NUT number, if any
    pub fn nut_settings(&self, nut: u16) -> Option<&NutValue> {
        self.nuts.get(&nut)
    }

    /// Whether the mint claims to support a given NUT at all, per the
    /// common `{"supported": bool}` and `{"disabled": bool}` idioms used
    /// by optional NUTs.
    pub fn supports(&self, nut: u16) -> bool {
        match self.nuts.get(&nut) {
            None => false,
            Some(NutValue::Object(fields)) => {
                if let Some(NutValue::Bool(supported)) = fields.get("supported") {
                    return *supported;
                }
                if let Some(NutValue::Bool(disabled)) = fields.get("disabled") {
                    return !*disabled;
                }
                true
            }
            Some(NutValue::Bool(supported)) => *supported,
            Some(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mint_info_with_nested_nut_settings() {
        let json = serde_json::json!({
            "name": "test-mint",
            "nuts": {
                "4": {"methods": [["bolt11", "sat"]], "disabled": false},
                "7": {"supported": true},
                "9": {"supported": false},
            }
        });

        let info: MintInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.name.as_deref(), Some("test-mint"));
        assert!(info.supports(4));
        assert!(info.supports(7));
        assert!(!info.supports(9));
        assert!(!info.supports(20));
    }
}
