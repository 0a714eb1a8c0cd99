use crate::core::credential_format::ClaimFormatMap;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, FORMAT_RESTRICTION};

use anyhow::Result;
use serde_json::json;

/// Checks each candidate's envelope format and algorithm/proof type against
/// the descriptor's format allow-list (falling back to the definition's),
/// intersected with the caller's `restrict_to_formats`.
pub struct FormatRestrictionHandler;

impl EvaluationHandler for FormatRestrictionHandler {
    fn name(&self) -> &'static str {
        FORMAT_RESTRICTION
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let restriction = client.options().restrict_to_formats().cloned();
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let base: &ClaimFormatMap = if descriptor.format().is_empty() {
                definition.format()
            } else {
                descriptor.format()
            };

            let allowed: ClaimFormatMap = match &restriction {
                None if base.is_empty() => continue,
                None => base.clone(),
                Some(restriction) if base.is_empty() => restriction.clone(),
                Some(restriction) => base
                    .iter()
                    .filter(|(designation, _)| restriction.contains_key(designation))
                    .map(|(designation, payload)| (designation.clone(), payload.clone()))
                    .collect(),
            };

            for credential_index in 0..client.credential_count() {
                let credential = &client.credentials()[credential_index];
                let designation = credential.format();

                let row = match allowed.get(&designation) {
                    None => HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        FORMAT_RESTRICTION,
                        Status::Error,
                        format!("Credential format {designation} is not accepted for the input descriptor"),
                    ),
                    Some(payload) => {
                        let accepted = payload.values();
                        let proof_types = credential.proof_types();
                        if accepted.is_empty()
                            || proof_types.iter().any(|t| accepted.contains(t))
                        {
                            HandlerCheckResult::new(
                                descriptor_index,
                                credential_index,
                                FORMAT_RESTRICTION,
                                Status::Info,
                                "Credential format satisfies the format restrictions",
                            )
                            .with_payload(json!({ "format": designation.to_string() }))
                        } else {
                            HandlerCheckResult::new(
                                descriptor_index,
                                credential_index,
                                FORMAT_RESTRICTION,
                                Status::Error,
                                format!(
                                    "Credential algorithm or proof type is not accepted for format {designation}"
                                ),
                            )
                            .with_payload(json!({ "proofTypes": proof_types }))
                        }
                    }
                };

                rows.push(row);
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
