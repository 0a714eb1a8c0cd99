use crate::core::presentation_definition::{PdVersion, PresentationDefinition};
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, URI_EVALUATION};

use anyhow::Result;
use serde_json::{json, Value};

/// v1 schema-URI matching: a candidate credential must cover every schema
/// entry marked required, drawing its URIs from `@context`,
/// `credentialSchema` and `type`.
pub struct UriEvaluationHandler;

impl EvaluationHandler for UriEvaluationHandler {
    fn name(&self) -> &'static str {
        URI_EVALUATION
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        if definition.version() != PdVersion::V1 {
            return Ok(());
        }

        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let Some(schema) = descriptor.schema() else {
                continue;
            };

            for credential_index in 0..client.credential_count() {
                let uris = credential_uris(client.credentials()[credential_index].decoded());

                let required_covered = schema
                    .iter()
                    .filter(|entry| entry.required)
                    .all(|entry| uris.contains(&entry.uri));
                // A list with no required entries is a list of alternatives.
                let alternatives_covered = schema.iter().any(|entry| entry.required)
                    || schema.iter().any(|entry| uris.contains(&entry.uri));

                if required_covered && alternatives_covered {
                    rows.push(
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            URI_EVALUATION,
                            Status::Info,
                            "Input candidate matches the schema URIs of the input descriptor",
                        )
                        .with_payload(json!({ "uris": uris })),
                    );
                } else {
                    rows.push(
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            URI_EVALUATION,
                            Status::Error,
                            "Input candidate does not match the schema URIs of the input descriptor",
                        )
                        .with_payload(json!({ "uris": uris })),
                    );
                }
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}

/// Collect the URIs a credential can be matched on: `@context` entries,
/// `credentialSchema` identifiers and `type` entries.
fn credential_uris(decoded: &Value) -> Vec<String> {
    let mut uris = Vec::new();

    collect_strings(decoded.get("@context"), &mut uris);
    collect_strings(decoded.get("type"), &mut uris);

    match decoded.get("credentialSchema") {
        Some(Value::Object(schema)) => collect_strings(schema.get("id"), &mut uris),
        Some(Value::Array(schemas)) => {
            for schema in schemas {
                collect_strings(schema.get("id"), &mut uris);
            }
        }
        Some(Value::String(schema)) => uris.push(schema.clone()),
        _ => {}
    }

    uris
}

fn collect_strings(value: Option<&Value>, into: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) => into.push(s.clone()),
        Some(Value::Array(values)) => {
            for value in values {
                if let Some(s) = value.as_str() {
                    into.push(s.to_string());
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn collects_context_type_and_schema_uris() {
        let uris = credential_uris(&json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "IDCardCredential"],
            "credentialSchema": { "id": "https://example.org/schema.json" }
        }));

        assert!(uris.contains(&"https://www.w3.org/2018/credentials/v1".to_string()));
        assert!(uris.contains(&"IDCardCredential".to_string()));
        assert!(uris.contains(&"https://example.org/schema.json".to_string()));
    }
}
