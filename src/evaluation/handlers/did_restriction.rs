use crate::core::presentation_definition::PresentationDefinition;
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{HandlerCheckResult, Status};

use super::{EvaluationHandler, DID_RESTRICTION};

use anyhow::Result;

/// Rejects credentials whose issuer DID method is outside the caller's
/// `restrict_to_did_methods` allow-list.
pub struct DidRestrictionHandler;

impl EvaluationHandler for DidRestrictionHandler {
    fn name(&self) -> &'static str {
        DID_RESTRICTION
    }

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()> {
        let methods = client.options().restrict_to_did_methods().to_vec();
        if methods.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::new();

        for descriptor_index in 0..definition.input_descriptors().len() {
            for credential_index in 0..client.credential_count() {
                let method = client.credentials()[credential_index]
                    .issuer_did_method()
                    .map(ToOwned::to_owned);

                let row = match method {
                    Some(method) if methods.contains(&method) => HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        DID_RESTRICTION,
                        Status::Info,
                        format!("Issuer DID method {method} is allow-listed"),
                    ),
                    Some(method) => HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        DID_RESTRICTION,
                        Status::Error,
                        format!("Issuer DID method {method} is not allow-listed"),
                    ),
                    None => HandlerCheckResult::new(
                        descriptor_index,
                        credential_index,
                        DID_RESTRICTION,
                        Status::Error,
                        "Issuer is not a DID and DID methods are restricted",
                    ),
                };

                rows.push(row);
            }
        }

        client.extend_results(rows);
        Ok(())
    }
}
