use std::collections::BTreeSet;

use crate::core::input_descriptor::Optionality;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, SAME_SUBJECT};

use anyhow::Result;
use serde_json::json;

/// Enforces the `same_subject` relational constraint: every still-eligible
/// credential mapped to the descriptors owning the referenced field ids must
/// resolve to the same subject.
pub struct SameSubjectHandler;

impl EvaluationHandler for SameSubjectHandler {
    fn name(&self) -> &'static str {
        SAME_SUBJECT
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            for directive in descriptor.constraints().same_subject() {
                // Descriptors across the whole definition owning one of the
                // referenced field ids.
                let involved: Vec<usize> = definition
                    .input_descriptors()
                    .iter()
                    .enumerate()
                    .filter(|(_, other)| {
                        other.constraints().fields().iter().any(|field| {
                            field
                                .id()
                                .is_some_and(|id| directive.field_ids().contains(id))
                        })
                    })
                    .map(|(index, _)| index)
                    .collect();

                // Credentials still in the running for any involved descriptor.
                let candidates: Vec<usize> = (0..client.credential_count())
                    .filter(|&credential_index| {
                        involved.iter().any(|&involved_index| {
                            !client.pair_has_error(involved_index, credential_index)
                        })
                    })
                    .collect();

                let subjects: BTreeSet<String> = candidates
                    .iter()
                    .flat_map(|&credential_index| {
                        client.credentials()[credential_index].subject_ids()
                    })
                    .collect();

                let agree = subjects.len() <= 1;

                for credential_index in candidates {
                    let row = if agree {
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            SAME_SUBJECT,
                            Status::Info,
                            "Input candidates share the same subject",
                        )
                        .with_payload(json!({ "fieldIdSet": directive.field_ids().as_ref() }))
                    } else {
                        let status = match directive.directive() {
                            Optionality::Required => Status::Error,
                            Optionality::Preferred => Status::Warn,
                        };
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            SAME_SUBJECT,
                            status,
                            "Input candidates resolve to diverging subjects",
                        )
                        .with_payload(json!({
                            "fieldIdSet": directive.field_ids().as_ref(),
                            "subjects": subjects
                        }))
                    };

                    rows.push(row);
                }
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
