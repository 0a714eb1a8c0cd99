use crate::core::jsonpath;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, FILTER_EVALUATION};

use anyhow::Result;
use serde_json::json;

/// Evaluates each constraint field of each input descriptor against each
/// candidate: the field's JSONPath alternatives are tried in order, the first
/// value found is run through the field's filter.
///
/// Emits exactly one result per field per `(descriptor, credential)` pair, in
/// field order — the predicate stage relies on this pairing.
pub struct InputDescriptorFilterHandler;

impl EvaluationHandler for InputDescriptorFilterHandler {
    fn name(&self) -> &'static str {
        FILTER_EVALUATION
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let fields = descriptor.constraints().fields();

            for credential_index in 0..client.credential_count() {
                if fields.is_empty() {
                    // No field constraints: the descriptor is trivially satisfied.
                    rows.push(HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        FILTER_EVALUATION,
                        Status::Info,
                        "Input candidate valid for presentation submission",
                    ));
                    continue;
                }

                for field in fields {
                    let mut hit = None;
                    for path in field.path().iter() {
                        let hits = jsonpath::extract(
                            client.credentials()[credential_index].decoded(),
                            path,
                        )?;
                        if let Some(first) = hits.into_iter().next() {
                            hit = Some(first);
                            break;
                        }
                    }

                    let row = match hit {
                        None => {
                            let status = if field.is_optional() {
                                Status::Info
                            } else {
                                Status::Error
                            };
                            HandlerCheckResult::new(
                                descriptor_index,
                                credential_index,
                                FILTER_EVALUATION,
                                status,
                                "Input candidate does not contain property",
                            )
                            .with_payload(json!({ "valid": field.is_optional() }))
                        }
                        Some(hit) => match field.filter() {
                            None => HandlerCheckResult::new(
                                descriptor_index,
                                credential_index,
                                FILTER_EVALUATION,
                                Status::Info,
                                "Input candidate valid for presentation submission",
                            )
                            .with_payload(json!({
                                "result": { "path": hit.path, "value": hit.value },
                                "valid": true
                            })),
                            Some(filter) => {
                                let outcome = filter.evaluate(&hit.value);
                                if outcome.matched {
                                    HandlerCheckResult::new(
                                        descriptor_index,
                                        credential_index,
                                        FILTER_EVALUATION,
                                        Status::Info,
                                        "Input candidate valid for presentation submission",
                                    )
                                    .with_payload(json!({
                                        "result": { "path": hit.path, "value": outcome.value },
                                        "valid": true
                                    }))
                                } else {
                                    HandlerCheckResult::new(
                                        descriptor_index,
                                        credential_index,
                                        FILTER_EVALUATION,
                                        Status::Error,
                                        "Input candidate failed filter evaluation",
                                    )
                                    .with_payload(json!({
                                        "result": { "path": hit.path, "value": hit.value },
                                        "valid": false
                                    }))
                                }
                            }
                        },
                    };

                    rows.push(row);
                }
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
