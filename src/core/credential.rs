use super::credential_format::ClaimFormatDesignation;

use anyhow::{bail, Context, Result};
use base64::prelude::*;
use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};

/// The original envelope a credential arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialEnvelope {
    /// A compact JWT string with a `vc` claim (VC-JWT).
    Jwt(String),
    /// A JSON-LD credential object with an embedded proof.
    Ldp(Value),
}

/// A credential normalized for evaluation.
///
/// Wraps the original envelope together with a decoded claim view so that one
/// JSONPath syntax addresses `credentialSubject`, `issuer`, `issuanceDate`
/// and friends regardless of whether the credential arrived as a JWT or as
/// JSON-LD. The decoded view is never mutated by evaluation; disclosure
/// projections are written to the client's output list instead.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedCredential {
    original: CredentialEnvelope,
    decoded: Value,
    jwt_alg: Option<String>,
}

impl WrappedCredential {
    /// Wrap an externally supplied credential.
    ///
    /// A JSON string is treated as a compact JWT, a JSON object as a JSON-LD
    /// credential. Anything else is a caller error.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(jwt) => Self::from_jwt(jwt),
            Value::Object(_) => Ok(Self {
                original: CredentialEnvelope::Ldp(value.clone()),
                decoded: value.clone(),
                jwt_alg: None,
            }),
            _ => bail!("credential must be a JWT string or a JSON object"),
        }
    }

    /// Wrap a compact VC-JWT, folding the registered claims into the `vc`
    /// claim per the VC data model JWT encoding rules.
    pub fn from_jwt(jwt: &str) -> Result<Self> {
        let mut parts = jwt.split('.');
        let (Some(header), Some(payload)) = (parts.next(), parts.next()) else {
            bail!("credential JWT must have header and payload parts");
        };

        let header = decode_jwt_part(header).context("credential JWT header")?;
        let payload = decode_jwt_part(payload).context("credential JWT payload")?;

        let mut decoded = match payload.get("vc") {
            Some(Value::Object(vc)) => Value::Object(vc.clone()),
            Some(_) => bail!("credential JWT `vc` claim must be an object"),
            None => Value::Object(Map::new()),
        };

        if let Some(iss) = payload.get("iss") {
            if decoded.get("issuer").is_none() {
                decoded["issuer"] = iss.clone();
            }
        }
        if let Some(jti) = payload.get("jti") {
            if decoded.get("id").is_none() {
                decoded["id"] = jti.clone();
            }
        }
        if let Some(sub) = payload.get("sub") {
            let subject = decoded
                .as_object_mut()
                .expect("decoded view is an object")
                .entry("credentialSubject")
                .or_insert_with(|| Value::Object(Map::new()));
            if subject.is_object() && subject.get("id").is_none() {
                subject["id"] = sub.clone();
            }
        }
        if decoded.get("issuanceDate").is_none() {
            if let Some(date) = payload
                .get("nbf")
                .or_else(|| payload.get("iat"))
                .and_then(Value::as_i64)
                .and_then(epoch_to_rfc3339)
            {
                decoded["issuanceDate"] = Value::String(date);
            }
        }
        if decoded.get("expirationDate").is_none() {
            if let Some(date) = payload.get("exp").and_then(Value::as_i64).and_then(epoch_to_rfc3339)
            {
                decoded["expirationDate"] = Value::String(date);
            }
        }

        Ok(Self {
            original: CredentialEnvelope::Jwt(jwt.to_string()),
            decoded,
            jwt_alg: header.get("alg").and_then(Value::as_str).map(ToOwned::to_owned),
        })
    }

    /// Return the original envelope.
    pub fn original(&self) -> &CredentialEnvelope {
        &self.original
    }

    /// Return the original envelope as a JSON value.
    pub fn original_json(&self) -> Value {
        match &self.original {
            CredentialEnvelope::Jwt(jwt) => Value::String(jwt.clone()),
            CredentialEnvelope::Ldp(value) => value.clone(),
        }
    }

    /// Return the decoded claim view — the stable JSONPath root.
    pub fn decoded(&self) -> &Value {
        &self.decoded
    }

    /// Return the claim format designation of the envelope.
    pub fn format(&self) -> ClaimFormatDesignation {
        match &self.original {
            CredentialEnvelope::Jwt(_) => ClaimFormatDesignation::jwt_vc(),
            CredentialEnvelope::Ldp(_) => ClaimFormatDesignation::ldp_vc(),
        }
    }

    /// Return the proof type identifiers of the credential: the linked data
    /// `proof.type` entries, or the JWT signing algorithm.
    pub fn proof_types(&self) -> Vec<String> {
        if let Some(alg) = &self.jwt_alg {
            return vec![alg.clone()];
        }

        match self.decoded.get("proof") {
            Some(Value::Object(proof)) => proof
                .get("type")
                .and_then(Value::as_str)
                .map(|t| vec![t.to_string()])
                .unwrap_or_default(),
            Some(Value::Array(proofs)) => proofs
                .iter()
                .filter_map(|proof| proof.get("type").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Return the issuer identifier: the `issuer` string, or `issuer.id`.
    pub fn issuer_id(&self) -> Option<&str> {
        match self.decoded.get("issuer") {
            Some(Value::String(issuer)) => Some(issuer),
            Some(Value::Object(issuer)) => issuer.get("id").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Return the DID method of the issuer, when the issuer is a DID.
    pub fn issuer_did_method(&self) -> Option<&str> {
        let issuer = self.issuer_id()?;
        let rest = issuer.strip_prefix("did:")?;
        let (method, _) = rest.split_once(':')?;
        Some(method)
    }

    /// Return the subject identifiers of the credential.
    ///
    /// `credentialSubject` may be a single object or an array of objects;
    /// subjects without an `id` contribute nothing.
    pub fn subject_ids(&self) -> Vec<String> {
        match self.decoded.get("credentialSubject") {
            Some(Value::Object(subject)) => subject
                .get("id")
                .and_then(Value::as_str)
                .map(|id| vec![id.to_string()])
                .unwrap_or_default(),
            Some(Value::Array(subjects)) => subjects
                .iter()
                .filter_map(|subject| subject.get("id").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn decode_jwt_part(part: &str) -> Result<Value> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(part)
        .context("not valid base64url")?;
    serde_json::from_slice(&bytes).context("not valid JSON")
}

fn epoch_to_rfc3339(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn encode_part(value: &Value) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn jwt_credential(payload: Value) -> String {
        let header = encode_part(&json!({ "alg": "ES256", "typ": "JWT" }));
        format!("{header}.{}.sig", encode_part(&payload))
    }

    #[test]
    fn wraps_jwt_with_canonical_claims() {
        let jwt = jwt_credential(json!({
            "iss": "did:example:issuer",
            "sub": "did:example:holder",
            "jti": "urn:uuid:5f7e6c1a",
            "nbf": 1262304000,
            "vc": {
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential"],
                "credentialSubject": { "degree": "Bachelor" }
            }
        }));

        let wrapped = WrappedCredential::from_json(&json!(jwt)).unwrap();
        let decoded = wrapped.decoded();

        assert_eq!(decoded["issuer"], json!("did:example:issuer"));
        assert_eq!(decoded["id"], json!("urn:uuid:5f7e6c1a"));
        assert_eq!(decoded["credentialSubject"]["id"], json!("did:example:holder"));
        assert_eq!(decoded["credentialSubject"]["degree"], json!("Bachelor"));
        assert_eq!(decoded["issuanceDate"], json!("2010-01-01T00:00:00Z"));
        assert_eq!(wrapped.proof_types(), vec!["ES256".to_string()]);
        assert_eq!(wrapped.format(), ClaimFormatDesignation::jwt_vc());
        assert_eq!(wrapped.original_json(), json!(jwt));
    }

    #[test]
    fn wraps_ldp_credential_as_is() {
        let credential = json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "issuer": { "id": "did:web:issuer.example" },
            "credentialSubject": { "id": "did:example:holder" },
            "proof": { "type": "Ed25519Signature2018" }
        });

        let wrapped = WrappedCredential::from_json(&credential).unwrap();

        assert_eq!(wrapped.decoded(), &credential);
        assert_eq!(wrapped.issuer_id(), Some("did:web:issuer.example"));
        assert_eq!(wrapped.issuer_did_method(), Some("web"));
        assert_eq!(wrapped.subject_ids(), vec!["did:example:holder".to_string()]);
        assert_eq!(wrapped.proof_types(), vec!["Ed25519Signature2018".to_string()]);
        assert_eq!(wrapped.format(), ClaimFormatDesignation::ldp_vc());
    }

    #[test]
    fn rejects_non_credential_values() {
        assert!(WrappedCredential::from_json(&json!(42)).is_err());
        assert!(WrappedCredential::from_json(&json!("not-a-jwt")).is_err());
    }

    #[test]
    fn multiple_subjects_collect_all_ids() {
        let wrapped = WrappedCredential::from_json(&json!({
            "credentialSubject": [
                { "id": "did:example:a" },
                { "name": "no id" },
                { "id": "did:example:b" }
            ]
        }))
        .unwrap();

        assert_eq!(
            wrapped.subject_ids(),
            vec!["did:example:a".to_string(), "did:example:b".to_string()]
        );
    }
}
