use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, MARK_FOR_SUBMISSION};

use anyhow::Result;

/// The final reduction stage: projects the log into one verdict per
/// `(descriptor, credential)` pair. A pair with any error-status entry is not
/// usable for the descriptor; every other pair is a submission candidate.
pub struct MarkForSubmissionHandler;

impl EvaluationHandler for MarkForSubmissionHandler {
    fn name(&self) -> &'static str {
        MARK_FOR_SUBMISSION
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let mut rows = Vec::new();

        for descriptor_index in 0..definition.input_descriptors().len() {
            for credential_index in 0..client.credential_count() {
                let verdict = client.pair_status(descriptor_index, credential_index);

                let row = if verdict == Status::Error {
                    HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        MARK_FOR_SUBMISSION,
                        Status::Error,
                        "Input candidate is not eligible for submission",
                    )
                } else {
                    HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        MARK_FOR_SUBMISSION,
                        Status::Info,
                        "Input candidate is eligible for submission",
                    )
                };

                rows.push(row);
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
