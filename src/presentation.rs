//! Verifiable presentation assembly and the signing seam.

use crate::core::presentation_submission::PresentationSubmission;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const VERIFIABLE_PRESENTATION_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";

pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";

pub const PRESENTATION_SUBMISSION_CONTEXT: &str =
    "https://identity.foundation/presentation-exchange/submission/v1";

pub const PRESENTATION_SUBMISSION_TYPE: &str = "PresentationSubmission";

/// Where the presentation submission travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresentationSubmissionLocation {
    /// Embedded in the presentation under `presentation_submission`.
    #[default]
    Presentation,
    /// Carried next to the presentation, e.g. as a DIDComm attachment.
    External,
}

/// An unsigned presentation together with the submission that maps its
/// credentials back to the definition.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationResult {
    pub presentation: Value,
    pub presentation_submission: PresentationSubmission,
    pub presentation_submission_location: PresentationSubmissionLocation,
}

/// The result of signing a presentation: the callback's output embedded
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiablePresentationResult {
    pub verifiable_presentation: Value,
    pub presentation_submission: PresentationSubmission,
    pub presentation_submission_location: PresentationSubmissionLocation,
}

/// The signing callback handed to `verifiable_presentation_from`.
///
/// Evaluation completes before the signer is awaited; whatever the signer
/// returns — a signed JSON-LD presentation, a JWT string — is embedded in the
/// result unchanged. Cryptography stays on the caller's side of this seam.
#[async_trait]
pub trait PresentationSigner {
    async fn sign(&self, presentation: &Value) -> Result<Value>;
}

/// Assemble the presentation envelope around the selected credentials.
///
/// The output always carries the credentials v1 context and the
/// `VerifiablePresentation` type; when the submission is embedded, the
/// presentation-exchange submission context and type are added alongside it.
pub fn assemble_presentation(
    credentials: &[Value],
    holder: Option<&str>,
    submission: &PresentationSubmission,
    location: PresentationSubmissionLocation,
) -> Value {
    let mut context = vec![Value::from(VERIFIABLE_PRESENTATION_CONTEXT_V1)];
    let mut types = vec![Value::from(VERIFIABLE_PRESENTATION_TYPE)];

    if location == PresentationSubmissionLocation::Presentation {
        context.push(Value::from(PRESENTATION_SUBMISSION_CONTEXT));
        types.push(Value::from(PRESENTATION_SUBMISSION_TYPE));
    }

    let mut presentation = json!({
        "@context": context,
        "type": types,
        "verifiableCredential": credentials,
    });

    if let Some(holder) = holder {
        presentation["holder"] = Value::from(holder);
    }

    if location == PresentationSubmissionLocation::Presentation {
        presentation["presentation_submission"] = submission.to_json();
    }

    presentation
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::presentation_submission::DescriptorMap;

    use serde_json::json;
    use uuid::Uuid;

    fn submission() -> PresentationSubmission {
        PresentationSubmission::new(
            Uuid::nil(),
            "definition-1".into(),
            vec![DescriptorMap::new(
                "descriptor-1",
                "ldp_vc",
                "$.verifiableCredential[0]".into(),
            )],
        )
    }

    #[test]
    fn embedded_submission_extends_context_and_type() {
        let credential = json!({ "type": ["VerifiableCredential"] });
        let presentation = assemble_presentation(
            std::slice::from_ref(&credential),
            Some("did:example:holder"),
            &submission(),
            PresentationSubmissionLocation::Presentation,
        );

        assert_eq!(
            presentation["@context"],
            json!([VERIFIABLE_PRESENTATION_CONTEXT_V1, PRESENTATION_SUBMISSION_CONTEXT])
        );
        assert_eq!(
            presentation["type"],
            json!([VERIFIABLE_PRESENTATION_TYPE, PRESENTATION_SUBMISSION_TYPE])
        );
        assert_eq!(presentation["holder"], json!("did:example:holder"));
        assert_eq!(
            presentation["presentation_submission"]["definition_id"],
            json!("definition-1")
        );
        assert_eq!(presentation["verifiableCredential"], json!([credential]));
    }

    #[test]
    fn external_submission_is_not_embedded() {
        let presentation = assemble_presentation(
            &[],
            None,
            &submission(),
            PresentationSubmissionLocation::External,
        );

        assert_eq!(presentation["@context"], json!([VERIFIABLE_PRESENTATION_CONTEXT_V1]));
        assert_eq!(presentation["type"], json!([VERIFIABLE_PRESENTATION_TYPE]));
        assert!(presentation.get("presentation_submission").is_none());
        assert!(presentation.get("holder").is_none());
    }
}
