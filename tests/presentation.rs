use pex::core::presentation_definition::PresentationDefinition;
use pex::evaluation::Status;
use pex::presentation::{
    PresentationSigner, PresentationSubmissionLocation, PRESENTATION_SUBMISSION_CONTEXT,
    VERIFIABLE_PRESENTATION_CONTEXT_V1,
};
use pex::{EvaluationOptions, JsonPath, PresentationExchange};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

fn definition() -> PresentationDefinition {
    PresentationDefinition::from_json(json!({
        "id": "presentation-check",
        "input_descriptors": [
            {
                "id": "name_descriptor",
                "constraints": { "fields": [{ "path": ["$.credentialSubject.name"] }] }
            },
            {
                "id": "email_descriptor",
                "constraints": { "fields": [{ "path": ["$.credentialSubject.email"] }] }
            }
        ]
    }))
    .unwrap()
}

fn credentials() -> Vec<Value> {
    vec![
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": { "name": "Jane" },
            "proof": { "type": "Ed25519Signature2018" }
        }),
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "issuer": "did:example:issuer",
            "credentialSubject": { "email": "jane@example.com" },
            "proof": { "type": "Ed25519Signature2018" }
        }),
    ]
}

#[test]
fn presentation_embeds_submission_and_contexts() {
    let options = EvaluationOptions::new().set_holder("did:example:holder".into());

    let result = PresentationExchange::new()
        .presentation_from(&definition(), &credentials(), &options)
        .unwrap();

    let presentation = &result.presentation;
    let contexts = presentation["@context"].as_array().unwrap();
    assert!(contexts.contains(&json!(VERIFIABLE_PRESENTATION_CONTEXT_V1)));
    assert!(contexts.contains(&json!(PRESENTATION_SUBMISSION_CONTEXT)));

    let types = presentation["type"].as_array().unwrap();
    assert!(types.contains(&json!("VerifiablePresentation")));
    assert!(types.contains(&json!("PresentationSubmission")));

    assert_eq!(presentation["holder"], json!("did:example:holder"));
    assert_eq!(
        presentation["presentation_submission"]["definition_id"],
        json!("presentation-check")
    );
}

#[test]
fn descriptor_map_paths_resolve_inside_the_presentation() {
    let result = PresentationExchange::new()
        .presentation_from(&definition(), &credentials(), &EvaluationOptions::new())
        .unwrap();

    for entry in result.presentation_submission.descriptor_map() {
        let path = JsonPath::parse(entry.path()).unwrap();
        let nodes = path.query(&result.presentation).all();
        assert_eq!(nodes.len(), 1, "path {} must address one credential", entry.path());
        assert!(nodes[0].get("credentialSubject").is_some());
    }
}

#[test]
fn external_submission_location_keeps_the_presentation_lean() {
    let options = EvaluationOptions::new()
        .set_presentation_submission_location(PresentationSubmissionLocation::External);

    let result = PresentationExchange::new()
        .presentation_from(&definition(), &credentials(), &options)
        .unwrap();

    assert_eq!(
        result.presentation_submission_location,
        PresentationSubmissionLocation::External
    );
    assert!(result.presentation.get("presentation_submission").is_none());
    // The submission still travels alongside, just not embedded.
    assert_eq!(result.presentation_submission.descriptor_map().len(), 2);
}

#[test]
fn unsatisfiable_definition_cannot_become_a_presentation() {
    let error = PresentationExchange::new()
        .presentation_from(&definition(), &[credentials()[0].clone()], &EvaluationOptions::new())
        .unwrap_err();

    assert!(error.to_string().contains("cannot assemble presentation"));
}

struct StubSigner;

#[async_trait]
impl PresentationSigner for StubSigner {
    async fn sign(&self, presentation: &Value) -> Result<Value> {
        let mut signed = presentation.clone();
        signed["proof"] = json!({
            "type": "Ed25519Signature2018",
            "proofPurpose": "authentication",
            "jws": "stub"
        });
        Ok(signed)
    }
}

#[tokio::test]
async fn signing_callback_output_is_embedded_verbatim() {
    let result = PresentationExchange::new()
        .verifiable_presentation_from(
            &definition(),
            &credentials(),
            &StubSigner,
            &EvaluationOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.verifiable_presentation["proof"]["jws"], json!("stub"));
    assert_eq!(
        result.verifiable_presentation["presentation_submission"]["definition_id"],
        json!("presentation-check")
    );
    assert_eq!(result.presentation_submission.descriptor_map().len(), 2);
}

#[test]
fn evaluate_presentation_honors_the_embedded_submission() {
    let pex = PresentationExchange::new();

    let assembled = pex
        .presentation_from(&definition(), &credentials(), &EvaluationOptions::new())
        .unwrap();

    let results = pex
        .evaluate_presentation(&definition(), &assembled.presentation, &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    assert_eq!(
        results.value.as_ref().unwrap(),
        &assembled.presentation_submission
    );
}

#[test]
fn evaluate_presentation_can_force_regeneration() {
    let pex = PresentationExchange::new();

    let assembled = pex
        .presentation_from(&definition(), &credentials(), &EvaluationOptions::new())
        .unwrap();

    let options = EvaluationOptions::new().set_generate_presentation_submission(true);
    let results = pex
        .evaluate_presentation(&definition(), &assembled.presentation, &options)
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    let regenerated = results.value.unwrap();
    // A fresh submission id, same mapping.
    assert_ne!(regenerated.id(), assembled.presentation_submission.id());
    assert_eq!(
        regenerated.descriptor_map(),
        assembled.presentation_submission.descriptor_map()
    );
}

#[test]
fn evaluate_presentation_rejects_a_mismatched_submission() {
    let pex = PresentationExchange::new();

    let assembled = pex
        .presentation_from(&definition(), &credentials(), &EvaluationOptions::new())
        .unwrap();

    // Swap the two descriptor paths so each references the wrong credential.
    let mut presentation = assembled.presentation.clone();
    presentation["presentation_submission"]["descriptor_map"][0]["path"] =
        json!("$.verifiableCredential[1]");
    presentation["presentation_submission"]["descriptor_map"][1]["path"] =
        json!("$.verifiableCredential[0]");

    let results = pex
        .evaluate_presentation(&definition(), &presentation, &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Error);
    assert!(!results.errors.is_empty());
}
