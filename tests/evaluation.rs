use pex::core::presentation_definition::PresentationDefinition;
use pex::evaluation::Status;
use pex::{EvaluationOptions, PresentationExchange};

use base64::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

fn definition(value: Value) -> PresentationDefinition {
    PresentationDefinition::from_json(value).unwrap()
}

fn bbs_credential(subject: Value) -> Value {
    json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": "did:example:issuer",
        "issuanceDate": "2020-01-01T00:00:00Z",
        "credentialSubject": subject,
        "proof": { "type": "BbsBlsSignature2020" }
    })
}

fn disclosure_options() -> EvaluationOptions {
    EvaluationOptions::new()
        .set_limit_disclosure_signature_suites(vec!["BbsBlsSignature2020".into()])
}

#[test]
fn age_predicate_with_limited_disclosure() {
    // One descriptor: age over 18 as a preferred predicate, disclosure
    // limited to the constraint fields.
    let definition = definition(json!({
        "id": "age-check",
        "input_descriptors": [
            {
                "id": "age_descriptor",
                "constraints": {
                    "limit_disclosure": "required",
                    "fields": [
                        {
                            "path": ["$.credentialSubject.age"],
                            "filter": { "type": "number", "minimum": 18 },
                            "predicate": "preferred"
                        }
                    ]
                }
            }
        ]
    }));

    let credential = bbs_credential(json!({
        "id": "did:example:holder",
        "age": 25,
        "etc": "hidden"
    }));

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential], &disclosure_options())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    assert!(results.value.is_some());

    let subject = &results.verifiable_credential[0]["credentialSubject"];
    // The raw value never leaks: the predicate held, nothing more.
    assert_eq!(subject["age"], json!(true));
    assert_eq!(subject["id"], json!("did:example:holder"));
    assert!(subject.get("etc").is_none());
}

#[test]
fn multiple_fields_with_extra_schema_uri() {
    // v1 descriptor with an extra schema entry pushed by the caller; the
    // birth place claim is not requested and must not survive projection.
    let definition = definition(json!({
        "id": "identity-check",
        "input_descriptors": [
            {
                "id": "identity_descriptor",
                "schema": [
                    { "uri": "https://example.org/identity.json" },
                    { "uri": "https://www.w3.org/2018/credentials/v1" }
                ],
                "constraints": {
                    "limit_disclosure": "required",
                    "fields": [
                        { "path": ["$.credentialSubject.name"] },
                        {
                            "path": ["$.credentialSubject.birthDate"],
                            "filter": { "type": "string", "format": "date" },
                            "predicate": "required"
                        }
                    ]
                }
            }
        ]
    }));

    let credential = bbs_credential(json!({
        "id": "did:example:holder",
        "name": "Jane Holder",
        "birthDate": "1990-05-17",
        "birthPlace": "Springfield"
    }));

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential], &disclosure_options())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);

    let subject = &results.verifiable_credential[0]["credentialSubject"];
    assert_eq!(subject["name"], json!("Jane Holder"));
    // A required predicate keeps the payload as-is.
    assert_eq!(subject["birthDate"], json!("1990-05-17"));
    assert!(subject.get("birthPlace").is_none());
}

#[test]
fn subject_is_issuer_required() {
    let definition = definition(json!({
        "id": "self-issued",
        "input_descriptors": [
            {
                "id": "self_issued_descriptor",
                "constraints": { "subject_is_issuer": "required" }
            }
        ]
    }));

    let self_issued = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": "did:x:1",
        "credentialSubject": { "id": "did:x:1" },
        "proof": { "type": "Ed25519Signature2018" }
    });

    let pex = PresentationExchange::new();
    let results = pex
        .evaluate_credentials(&definition, &[self_issued.clone()], &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Info);

    let mut third_party = self_issued;
    third_party["issuer"] = json!("did:x:2");
    let results = pex
        .evaluate_credentials(&definition, &[third_party], &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Error);
    assert!(results
        .errors
        .iter()
        .any(|error| error.message.contains("not its issuer")));
}

#[test]
fn pick_rule_selects_lowest_indexed_satisfiable_descriptors() {
    let definition = definition(json!({
        "id": "pick-check",
        "submission_requirements": [
            { "rule": "pick", "from": "A", "min": 2, "max": 3 }
        ],
        "input_descriptors": [
            {
                "id": "d0",
                "group": ["A"],
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f0"] }] }
            },
            {
                "id": "d1",
                "group": ["A"],
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f1"] }] }
            },
            {
                "id": "d2",
                "group": ["A"],
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f2"] }] }
            },
            {
                "id": "d3",
                "group": ["A"],
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f3"] }] }
            }
        ]
    }));

    // Three credentials, satisfying d0, d1 and d3; d2 stays unsatisfied.
    let credentials = vec![
        bbs_credential(json!({ "f0": "a" })),
        bbs_credential(json!({ "f1": "b" })),
        bbs_credential(json!({ "f3": "c" })),
    ];

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &credentials, &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    let submission = results.value.unwrap();
    let ids: Vec<&str> = submission
        .descriptor_map()
        .iter()
        .map(|entry| entry.id())
        .collect();
    assert_eq!(ids, vec!["d0", "d1", "d3"]);
    assert_eq!(submission.descriptor_map().len(), 3);
    assert_eq!(
        submission.descriptor_map()[2].path(),
        "$.verifiableCredential[2]"
    );
}

#[test]
fn limit_disclosure_required_with_unsupported_suite() {
    let definition = definition(json!({
        "id": "disclosure-check",
        "input_descriptors": [
            {
                "id": "strict_descriptor",
                "constraints": {
                    "limit_disclosure": "required",
                    "fields": [{ "path": ["$.credentialSubject.name"] }]
                }
            }
        ]
    }));

    let credential = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": "did:example:issuer",
        "credentialSubject": { "name": "Jane", "secret": "stays" },
        "proof": { "type": "Ed25519Signature2018" }
    });

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential.clone()], &disclosure_options())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Error);
    assert!(results.value.is_none());
    // The credential is passed through untouched.
    assert_eq!(results.verifiable_credential, vec![credential]);
    assert!(results
        .errors
        .iter()
        .any(|error| error.message.contains("signature suite does not support")));
}

#[test]
fn filter_type_mismatch_references_the_failing_pair() {
    let definition = definition(json!({
        "id": "type-check",
        "input_descriptors": [
            {
                "id": "integer_descriptor",
                "constraints": {
                    "fields": [
                        {
                            "path": ["$.credentialSubject.age"],
                            "filter": { "type": "integer" }
                        }
                    ]
                }
            }
        ]
    }));

    let credential = bbs_credential(json!({ "age": "25" }));

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential], &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Error);
    assert!(results.errors.iter().any(|error| {
        error.message.contains("failed filter evaluation")
            && error.message.contains("$.input_descriptors[0]")
            && error.message.contains("$.verifiableCredential[0]")
    }));
}

#[test]
fn evaluation_is_deterministic() {
    let definition = definition(json!({
        "id": "deterministic",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": { "fields": [{ "path": ["$.credentialSubject.name"] }] }
            }
        ]
    }));

    let credentials = vec![bbs_credential(json!({ "name": "Jane" }))];
    let options = EvaluationOptions::new().set_submission_id(Uuid::nil());
    let pex = PresentationExchange::new();

    let first = pex
        .evaluate_credentials(&definition, &credentials, &options)
        .unwrap();
    let second = pex
        .evaluate_credentials(&definition, &credentials, &options)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.value).unwrap(),
        serde_json::to_string(&second.value).unwrap()
    );
}

#[test]
fn identity_projection_without_limit_disclosure() {
    let definition = definition(json!({
        "id": "identity-projection",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f0"] }] }
            },
            {
                "id": "d1",
                "constraints": { "fields": [{ "path": ["$.credentialSubject.f1"] }] }
            }
        ]
    }));

    let credentials = vec![
        bbs_credential(json!({ "f0": "a", "extra": "kept" })),
        bbs_credential(json!({ "f1": "b" })),
    ];

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &credentials, &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    assert_eq!(results.verifiable_credential, credentials);
}

#[test]
fn jwt_credential_shares_the_jsonpath_root() {
    fn encode(value: &Value) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    let header = encode(&json!({ "alg": "ES256", "typ": "JWT" }));
    let payload = encode(&json!({
        "iss": "did:example:issuer",
        "sub": "did:example:holder",
        "nbf": 1262304000,
        "vc": {
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential"],
            "credentialSubject": { "degree": "Bachelor" }
        }
    }));
    let jwt = format!("{header}.{payload}.signature");

    let definition = definition(json!({
        "id": "jwt-check",
        "input_descriptors": [
            {
                "id": "degree_descriptor",
                "constraints": {
                    "fields": [
                        {
                            "path": ["$.credentialSubject.degree"],
                            "filter": { "type": "string", "const": "Bachelor" }
                        },
                        { "path": ["$.issuer"] }
                    ]
                }
            }
        ]
    }));

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[json!(jwt)], &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
    let submission = results.value.unwrap();
    assert_eq!(submission.descriptor_map()[0].format().to_string(), "jwt_vc");
    // Without disclosure projection, the original envelope is passed through.
    assert_eq!(results.verifiable_credential, vec![json!(jwt)]);
}

#[test]
fn v2_format_restriction_checks_proof_type() {
    let definition = definition(json!({
        "id": "format-check",
        "input_descriptors": [
            {
                "id": "ldp_descriptor",
                "format": { "ldp_vc": { "proof_type": ["Ed25519Signature2018"] } },
                "constraints": { "fields": [{ "path": ["$.credentialSubject.name"] }] }
            }
        ]
    }));

    let pex = PresentationExchange::new();

    let accepted = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": "did:example:issuer",
        "credentialSubject": { "name": "Jane" },
        "proof": { "type": "Ed25519Signature2018" }
    });
    let results = pex
        .evaluate_credentials(&definition, &[accepted], &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Info);

    let rejected = bbs_credential(json!({ "name": "Jane" }));
    let results = pex
        .evaluate_credentials(&definition, &[rejected], &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Error);
}

#[test]
fn did_method_restriction_rejects_foreign_issuers() {
    let definition = definition(json!({
        "id": "did-check",
        "input_descriptors": [
            { "id": "d0", "constraints": { "fields": [{ "path": ["$.credentialSubject.name"] }] } }
        ]
    }));

    let credential = bbs_credential(json!({ "name": "Jane" }));
    let pex = PresentationExchange::new();

    let allowed = EvaluationOptions::new().set_restrict_to_did_methods(vec!["example".into()]);
    let results = pex
        .evaluate_credentials(&definition, &[credential.clone()], &allowed)
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Info);

    let denied = EvaluationOptions::new().set_restrict_to_did_methods(vec!["web".into()]);
    let results = pex
        .evaluate_credentials(&definition, &[credential], &denied)
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Error);
}

#[test]
fn is_holder_requires_wallet_controlled_subject() {
    let definition = definition(json!({
        "id": "holder-check",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": {
                    "is_holder": [
                        { "field_id": ["name_field"], "directive": "required" }
                    ],
                    "fields": [
                        { "id": "name_field", "path": ["$.credentialSubject.name"] }
                    ]
                }
            }
        ]
    }));

    let credential = bbs_credential(json!({ "id": "did:example:holder", "name": "Jane" }));
    let pex = PresentationExchange::new();

    let holding = EvaluationOptions::new().set_holder_dids(vec!["did:example:holder".into()]);
    let results = pex
        .evaluate_credentials(&definition, &[credential.clone()], &holding)
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Info);

    let not_holding = EvaluationOptions::new().set_holder_dids(vec!["did:example:other".into()]);
    let results = pex
        .evaluate_credentials(&definition, &[credential], &not_holding)
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Error);
}

#[test]
fn same_subject_detects_divergence() {
    let definition = definition(json!({
        "id": "same-subject-check",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": {
                    "same_subject": [
                        { "field_id": ["f0", "f1"], "directive": "required" }
                    ],
                    "fields": [{ "id": "f0", "path": ["$.credentialSubject.a"] }]
                }
            },
            {
                "id": "d1",
                "constraints": {
                    "fields": [{ "id": "f1", "path": ["$.credentialSubject.b"] }]
                }
            }
        ]
    }));

    let pex = PresentationExchange::new();

    let same = vec![
        bbs_credential(json!({ "id": "did:example:one", "a": 1 })),
        bbs_credential(json!({ "id": "did:example:one", "b": 2 })),
    ];
    let results = pex
        .evaluate_credentials(&definition, &same, &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Info);

    let diverging = vec![
        bbs_credential(json!({ "id": "did:example:one", "a": 1 })),
        bbs_credential(json!({ "id": "did:example:two", "b": 2 })),
    ];
    let results = pex
        .evaluate_credentials(&definition, &diverging, &EvaluationOptions::new())
        .unwrap();
    assert_eq!(results.are_required_credentials_present, Status::Error);
}

#[test]
fn preferred_violations_downgrade_to_warn() {
    // Preferred limit disclosure with an unsupported suite: the candidate
    // stays eligible, the outcome is a warning.
    let definition = definition(json!({
        "id": "preferred-disclosure",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": {
                    "limit_disclosure": "preferred",
                    "fields": [{ "path": ["$.credentialSubject.name"] }]
                }
            }
        ]
    }));

    let credential = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": "did:example:issuer",
        "credentialSubject": { "name": "Jane" },
        "proof": { "type": "Ed25519Signature2018" }
    });

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential], &disclosure_options())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Warn);
    assert!(results.value.is_some());
    assert!(!results.warnings.is_empty());
}

#[test]
fn optional_field_absence_is_not_an_error() {
    let definition = definition(json!({
        "id": "optional-field",
        "input_descriptors": [
            {
                "id": "d0",
                "constraints": {
                    "fields": [
                        { "path": ["$.credentialSubject.name"] },
                        { "path": ["$.credentialSubject.nickname"], "optional": true }
                    ]
                }
            }
        ]
    }));

    let credential = bbs_credential(json!({ "name": "Jane" }));

    let results = PresentationExchange::new()
        .evaluate_credentials(&definition, &[credential], &EvaluationOptions::new())
        .unwrap();

    assert_eq!(results.are_required_credentials_present, Status::Info);
}

#[test]
fn definition_parse_errors_carry_their_path() {
    let value = json!({
        "id": "broken",
        "input_descriptors": [
            { "id": "d0", "constraints": { "fields": [{ "path": [] }] } }
        ]
    });

    let error: serde_path_to_error::Error<serde_json::Error> =
        serde_path_to_error::deserialize::<_, PresentationDefinition>(value).unwrap_err();

    assert!(error.path().to_string().contains("input_descriptors[0]"));
}

#[test]
fn non_json_credential_is_an_input_error() {
    let definition = definition(json!({
        "id": "bad-input",
        "input_descriptors": [{ "id": "d0", "constraints": {} }]
    }));

    let result = PresentationExchange::new().evaluate_credentials(
        &definition,
        &[json!(42)],
        &EvaluationOptions::new(),
    );

    assert!(result.is_err());
}
