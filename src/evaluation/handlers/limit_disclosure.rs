use std::collections::BTreeMap;

use crate::core::input_descriptor::Optionality;
use crate::core::jsonpath::{insert_at, parse_concrete_path};
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, FILTER_EVALUATION, LIMIT_DISCLOSURE, PREDICATE_RELATED_FIELD};

use anyhow::Result;
use serde_json::{json, Map, Value};

/// Top-level credential fields that survive a limited-disclosure projection
/// regardless of the disclosed paths.
const MANDATORY_FIELDS: [&str; 8] = [
    "@context",
    "type",
    "id",
    "issuer",
    "issuanceDate",
    "expirationDate",
    "credentialSchema",
    "credentialStatus",
];

/// Projects candidates of limit-disclosure descriptors down to the disclosed
/// claims, provided the credential's signature suite supports selective
/// disclosure.
///
/// The projection replaces the credential in the client's output list; the
/// wrapped source credential is never mutated.
pub struct LimitDisclosureHandler;

impl EvaluationHandler for LimitDisclosureHandler {
    fn name(&self) -> &'static str {
        LIMIT_DISCLOSURE
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let suites = client.options().limit_disclosure_signature_suites().to_vec();
        let mut rows = Vec::new();
        // Accumulated per credential so that several descriptors disclosing
        // from the same credential union their projections.
        let mut projections: BTreeMap<usize, Value> = BTreeMap::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let Some(directive) = descriptor.constraints().limit_disclosure() else {
                continue;
            };

            for credential_index in 0..client.credential_count() {
                if client.pair_has_error(descriptor_index, credential_index) {
                    continue;
                }

                let credential = &client.credentials()[credential_index];
                let supported = credential
                    .proof_types()
                    .iter()
                    .any(|proof_type| suites.contains(proof_type));

                if !supported {
                    tracing::debug!(
                        credential_index,
                        proof_types = ?credential.proof_types(),
                        "no selective-disclosure suite covers the credential"
                    );
                    let row = match directive {
                        Optionality::Required => HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            LIMIT_DISCLOSURE,
                            Status::Error,
                            "Limit disclosure required but the signature suite does not support it",
                        ),
                        Optionality::Preferred => HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            LIMIT_DISCLOSURE,
                            Status::Warn,
                            "Limit disclosure preferred but the signature suite does not support it",
                        ),
                    };
                    rows.push(row);
                    continue;
                }

                // Concrete paths (and values) surfaced for this pair; later
                // entries win, so predicate conversions overwrite raw values.
                let disclosed: Vec<(String, Value)> = client
                    .results_for_pair(descriptor_index, credential_index)
                    .filter(|result| {
                        result.status == Status::Info
                            && (result.evaluator == FILTER_EVALUATION
                                || result.evaluator == PREDICATE_RELATED_FIELD)
                    })
                    .filter_map(|result| {
                        let inner = result.payload.as_ref()?.get("result")?;
                        Some((
                            inner.get("path")?.as_str()?.to_string(),
                            inner.get("value")?.clone(),
                        ))
                    })
                    .collect();

                let decoded = credential.decoded();
                let projected = projections
                    .entry(credential_index)
                    .or_insert_with(|| mandatory_projection(decoded));

                let mut disclosed_paths = Vec::new();
                for (path, value) in &disclosed {
                    let segments = parse_concrete_path(path)?;
                    insert_at(projected, &segments, value);
                    disclosed_paths.push(path.clone());
                }

                rows.push(
                    HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        LIMIT_DISCLOSURE,
                        Status::Info,
                        "Limited disclosure applied to the input candidate",
                    )
                    .with_payload(json!({ "disclosedPaths": disclosed_paths })),
                );
            }
        }

        for (credential_index, projected) in projections {
            client.replace_credential(credential_index, projected);
        }
        client.extend_results(rows);
        Ok(())
    }
}

/// The projection seed: structurally mandatory top-level fields plus the
/// subject binding id.
fn mandatory_projection(decoded: &Value) -> Value {
    let mut projected = Map::new();

    for field in MANDATORY_FIELDS {
        if let Some(value) = decoded.get(field) {
            projected.insert(field.to_string(), value.clone());
        }
    }

    if let Some(subject_id) = decoded.pointer("/credentialSubject/id") {
        projected.insert(
            "credentialSubject".to_string(),
            json!({ "id": subject_id.clone() }),
        );
    }

    Value::Object(projected)
}
