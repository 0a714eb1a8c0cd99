use crate::core::credential::WrappedCredential;
use crate::core::presentation_definition::PresentationDefinition;
use crate::exchange::EvaluationOptions;

use super::handlers::{handler_chain, MARK_FOR_SUBMISSION};
use super::results::{HandlerCheckResult, Status};

use anyhow::Result;
use serde_json::Value;

/// Runs the evaluation handler chain over one credential set.
///
/// A client is constructed fresh for every evaluation call and dropped with
/// it: the result log and the credential output list are the only state, and
/// both live exactly as long as the call.
pub struct EvaluationClient {
    options: EvaluationOptions,
    credentials: Vec<WrappedCredential>,
    verifiable_credential: Vec<Value>,
    results: Vec<HandlerCheckResult>,
}

impl EvaluationClient {
    pub fn new(options: EvaluationOptions, credentials: Vec<WrappedCredential>) -> Self {
        let verifiable_credential = credentials
            .iter()
            .map(WrappedCredential::original_json)
            .collect();

        Self {
            options,
            credentials,
            verifiable_credential,
            results: Vec::new(),
        }
    }

    /// Run the handler chain in its fixed order.
    ///
    /// Constraint failures are recorded in the log; only contract violations
    /// (e.g. an unparseable JSONPath in the definition) surface as errors.
    pub fn evaluate(&mut self, definition: &PresentationDefinition) -> Result<()> {
        for handler in handler_chain() {
            tracing::debug!(handler = handler.name(), "running evaluation handler");
            handler.handle(definition, self)?;
        }
        Ok(())
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn credentials(&self) -> &[WrappedCredential] {
        &self.credentials
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// The credential output list: original envelopes, with limit-disclosure
    /// projections applied in place.
    pub fn verifiable_credential(&self) -> &[Value] {
        &self.verifiable_credential
    }

    /// Replace the output entry for a credential with its projected form.
    pub fn replace_credential(&mut self, index: usize, projected: Value) {
        if let Some(slot) = self.verifiable_credential.get_mut(index) {
            *slot = projected;
        }
    }

    pub fn results(&self) -> &[HandlerCheckResult] {
        &self.results
    }

    pub fn extend_results(&mut self, rows: impl IntoIterator<Item = HandlerCheckResult>) {
        self.results.extend(rows);
    }

    /// Results recorded for one `(descriptor, credential)` pair, in log order.
    pub fn results_for_pair(
        &self,
        descriptor_index: usize,
        credential_index: usize,
    ) -> impl Iterator<Item = &HandlerCheckResult> {
        let descriptor_path = super::results::input_descriptor_path(descriptor_index);
        let credential_path = super::results::verifiable_credential_path(credential_index);

        self.results.iter().filter(move |result| {
            result.input_descriptor_path == descriptor_path
                && result.verifiable_credential_path == credential_path
        })
    }

    /// The aggregated verdict for a pair: the maximum severity recorded.
    pub fn pair_status(&self, descriptor_index: usize, credential_index: usize) -> Status {
        self.results_for_pair(descriptor_index, credential_index)
            .map(|result| result.status)
            .max()
            .unwrap_or(Status::Info)
    }

    pub fn pair_has_error(&self, descriptor_index: usize, credential_index: usize) -> bool {
        self.pair_status(descriptor_index, credential_index) == Status::Error
    }

    pub fn pair_has_warning(&self, descriptor_index: usize, credential_index: usize) -> bool {
        self.results_for_pair(descriptor_index, credential_index)
            .any(|result| result.status == Status::Warn)
    }

    /// The candidate credentials per descriptor, read off the
    /// MarkForSubmission verdicts.
    pub fn candidate_matrix(&self, descriptor_count: usize) -> Vec<Vec<usize>> {
        (0..descriptor_count)
            .map(|descriptor_index| {
                (0..self.credentials.len())
                    .filter(|&credential_index| {
                        self.results_for_pair(descriptor_index, credential_index).any(|result| {
                            result.evaluator == MARK_FOR_SUBMISSION
                                && result.status == Status::Info
                        })
                    })
                    .collect()
            })
            .collect()
    }
}
