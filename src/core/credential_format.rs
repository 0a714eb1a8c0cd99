use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A format allow-list: claim format designation to the algorithms or proof
/// types accepted for it.
///
/// Appears on the presentation definition, on individual input descriptors
/// (overriding the definition's), and in the caller's `restrict_to_formats`
/// option; the format-restriction handler intersects the three.
pub type ClaimFormatMap = HashMap<ClaimFormatDesignation, ClaimFormatPayload>;

/// A registered claim format designation, e.g. `jwt_vc`, `ldp_vc` or
/// `dc+sd-jwt`.
///
/// The evaluation core never enumerates the format registry. A designation is
/// an opaque name: the format handler only compares the designation derived
/// from a credential's envelope against allow-list keys, so registry entries
/// this crate has never heard of flow through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimFormatDesignation(String);

impl ClaimFormatDesignation {
    /// The designation of a compact VC-JWT envelope.
    pub fn jwt_vc() -> Self {
        Self("jwt_vc".into())
    }

    /// The designation of a JSON-LD credential with an embedded proof.
    pub fn ldp_vc() -> Self {
        Self("ldp_vc".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClaimFormatDesignation {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ClaimFormatDesignation {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<ClaimFormatDesignation> for String {
    fn from(designation: ClaimFormatDesignation) -> Self {
        designation.0
    }
}

impl fmt::Display for ClaimFormatDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The constraint object under one allow-list entry: which algorithm or
/// proof type identifiers the verifier accepts for that format.
///
/// `jwt`-family formats carry `alg` (or `alg_values_supported` in wallet
/// metadata), `ldp`-family formats carry `proof_type`. Entries with other
/// shapes are preserved but constrain nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimFormatPayload {
    #[serde(rename = "alg")]
    Alg(Vec<String>),
    #[serde(rename = "alg_values_supported")]
    AlgValuesSupported(Vec<String>),
    #[serde(rename = "proof_type")]
    ProofType(Vec<String>),
    #[serde(untagged)]
    Other(serde_json::Value),
}

impl ClaimFormatPayload {
    /// The identifiers a credential's algorithm or proof type is checked
    /// against. Empty means the entry does not constrain them.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Alg(values) | Self::AlgValuesSupported(values) | Self::ProofType(values) => {
                values
            }
            Self::Other(_) => &[],
        }
    }
}
