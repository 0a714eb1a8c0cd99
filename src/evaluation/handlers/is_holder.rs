use crate::core::input_descriptor::Optionality;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, IS_HOLDER};

use anyhow::Result;
use serde_json::json;

/// Enforces the `is_holder` relational constraint: the subject of the claims
/// referenced by each directive must be one of the DIDs the wallet controls.
pub struct IsHolderHandler;

impl EvaluationHandler for IsHolderHandler {
    fn name(&self) -> &'static str {
        IS_HOLDER
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let holder_dids = client.options().holder_dids().to_vec();
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            for directive in descriptor.constraints().is_holder() {
                for credential_index in 0..client.credential_count() {
                    let subjects = client.credentials()[credential_index].subject_ids();
                    let held = !subjects.is_empty()
                        && subjects.iter().all(|subject| holder_dids.contains(subject));

                    let row = if held {
                        HandlerCheckResult::new(
                            descriptor_index,
                            credential_index,
                            IS_HOLDER,
                            Status::Info,
                            "Subject of the input candidate is controlled by the holder",
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
                            IS_HOLDER,
                            status,
                            "Subject of the input candidate is not controlled by the holder",
                        )
                        .with_payload(json!({ "fieldIdSet": directive.field_ids().as_ref() }))
                    };

                    rows.push(row);
                }
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
