use crate::core::presentation_submission::PresentationSubmission;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a handler check result.
///
/// Ordered so that the final verdict for a `(descriptor, credential)` pair is
/// the maximum severity across all results recorded for that pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Info,
    Warn,
    Error,
}

/// One entry of the evaluation result log.
///
/// Paths are JSONPath strings rooted at the definition
/// (`$.input_descriptors[i]`) and the credential set
/// (`$.verifiableCredential[j]`); the evaluator name identifies the handler
/// that appended the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerCheckResult {
    pub input_descriptor_path: String,
    pub verifiable_credential_path: String,
    pub evaluator: String,
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl HandlerCheckResult {
    pub fn new(
        descriptor_index: usize,
        credential_index: usize,
        evaluator: &str,
        status: Status,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input_descriptor_path: input_descriptor_path(descriptor_index),
            verifiable_credential_path: verifiable_credential_path(credential_index),
            evaluator: evaluator.to_string(),
            status,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// The JSONPath of an input descriptor within its definition.
pub fn input_descriptor_path(index: usize) -> String {
    format!("$.input_descriptors[{index}]")
}

/// The JSONPath of a credential within the credential set under evaluation.
pub fn verifiable_credential_path(index: usize) -> String {
    format!("$.verifiableCredential[{index}]")
}

/// A summarized error or warning row surfaced to callers, both by evaluation
/// results and by validation reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checked {
    pub tag: String,
    pub status: Status,
    pub message: String,
}

impl Checked {
    pub fn new(tag: impl Into<String>, status: Status, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status,
            message: message.into(),
        }
    }
}

/// The aggregate outcome of evaluating a credential set against a
/// presentation definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResults {
    /// The synthesized (or caller-provided) presentation submission, when the
    /// definition could be satisfied.
    pub value: Option<PresentationSubmission>,
    pub errors: Vec<Checked>,
    pub warnings: Vec<Checked>,
    /// The credentials referenced by the descriptor map, in reference order,
    /// with limited-disclosure projections applied. When no submission could
    /// be synthesized this carries the full (possibly projected) input set.
    pub verifiable_credential: Vec<Value>,
    pub are_required_credentials_present: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_orders_by_severity() {
        assert!(Status::Error > Status::Warn);
        assert!(Status::Warn > Status::Info);
        assert_eq!(
            [Status::Info, Status::Error, Status::Warn].into_iter().max(),
            Some(Status::Error)
        );
    }

    #[test]
    fn result_paths_are_rooted() {
        let result = HandlerCheckResult::new(2, 0, "FilterEvaluation", Status::Info, "ok");

        assert_eq!(result.input_descriptor_path, "$.input_descriptors[2]");
        assert_eq!(result.verifiable_credential_path, "$.verifiableCredential[0]");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Status::Warn).unwrap(), "warn");
    }
}
