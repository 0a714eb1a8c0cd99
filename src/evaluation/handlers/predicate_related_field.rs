use crate::core::input_descriptor::Optionality;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, FILTER_EVALUATION, PREDICATE_RELATED_FIELD};

use anyhow::Result;
use serde_json::{json, Value};

/// Converts filter outcomes into Boolean predicates.
///
/// For every field with a `predicate` directive whose filter matched,
/// a predicate result is appended: `required` carries the filter payload
/// unchanged, `preferred` replaces the matched value with the Boolean `true`
/// so the verifier learns only that the predicate held. The conversion works
/// on a copy of the payload; the source credential and the filter results are
/// left untouched.
pub struct PredicateRelatedFieldHandler;

impl EvaluationHandler for PredicateRelatedFieldHandler {
    fn name(&self) -> &'static str {
        PREDICATE_RELATED_FIELD
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let fields = descriptor.constraints().fields();
            if fields.is_empty() {
                continue;
            }

            for credential_index in 0..client.credential_count() {
                // FilterEvaluation emits one result per field, in field order.
                let field_results: Vec<&HandlerCheckResult> = client
                    .results_for_pair(descriptor_index, credential_index)
                    .filter(|result| result.evaluator == FILTER_EVALUATION)
                    .collect();

                let mut converted = Vec::new();
                for (field, result) in fields.iter().zip(field_results) {
                    let Some(predicate) = field.predicate() else {
                        continue;
                    };
                    if result.status != Status::Info {
                        continue;
                    }
                    let Some(payload) = result.payload.clone() else {
                        continue;
                    };

                    let payload = match predicate {
                        Optionality::Required => payload,
                        Optionality::Preferred => booleanize(payload),
                    };

                    converted.push(
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            PREDICATE_RELATED_FIELD,
                            Status::Info,
                            "Input candidate valid for presentation submission",
                        )
                        .with_payload(payload),
                    );
                }

                rows.extend(converted);
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}

/// Replace `result.value` with the Boolean `true` in a copy of the payload.
fn booleanize(mut payload: Value) -> Value {
    if let Some(result) = payload.get_mut("result") {
        result["value"] = json!(true);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleanize_replaces_the_value_only() {
        let payload = json!({
            "result": { "path": "$['credentialSubject']['age']", "value": 25 },
            "valid": true
        });

        assert_eq!(
            booleanize(payload),
            json!({
                "result": { "path": "$['credentialSubject']['age']", "value": true },
                "valid": true
            })
        );
    }
}
