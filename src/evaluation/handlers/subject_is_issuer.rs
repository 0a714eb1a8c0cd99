use crate::core::input_descriptor::Optionality;
use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, SUBJECT_IS_ISSUER};

use anyhow::Result;

/// Enforces the `subject_is_issuer` relational constraint: the credential
/// subject must also be the credential issuer (self-issued credential).
pub struct SubjectIsIssuerHandler;

impl EvaluationHandler for SubjectIsIssuerHandler {
    fn name(&self) -> &'static str {
        SUBJECT_IS_ISSUER
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let mut rows = Vec::new();

        for (descriptor_index, descriptor) in definition.input_descriptors().iter().enumerate() {
            let Some(directive) = descriptor.constraints().subject_is_issuer() else {
                continue;
            };

            for credential_index in 0..client.credential_count() {
                let credential = &client.credentials()[credential_index];
                let issuer = credential.issuer_id().map(ToOwned::to_owned);
                let subjects = credential.subject_ids();

                let self_issued = issuer
                    .as_deref()
                    .is_some_and(|issuer| subjects.iter().any(|subject| subject == issuer));

                let row = if self_issued {
                    HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        SUBJECT_IS_ISSUER,
                        Status::Info,
                        "Subject of the input candidate is also its issuer",
                    )
                } else {
                    let status = match directive {
                        Optionality::Required => Status::Error,
                        Optionality::Preferred => Status::Warn,
                    };
                    HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        SUBJECT_IS_ISSUER,
                        status,
                        "Subject of the input candidate is not its issuer",
                    )
                };

                rows.push(row);
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
