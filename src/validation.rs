//! Structural validation of presentation definitions and submissions.
//!
//! Validation runs before evaluation and reports collected findings instead
//! of failing fast: a report either passes or names every violated rule.

use std::collections::HashSet;

use crate::core::presentation_definition::{
    PresentationDefinition, SubmissionRequirement, SubmissionRequirementBase,
};
use crate::core::presentation_submission::PresentationSubmission;
use crate::evaluation::results::{Checked, Status};

use serde::{Deserialize, Serialize};
use serde_json_path::JsonPath;
use url::Url;

/// The collected findings of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    checks: Vec<Checked>,
}

impl ValidationReport {
    pub fn checks(&self) -> &[Checked] {
        &self.checks
    }

    pub fn is_valid(&self) -> bool {
        self.checks
            .iter()
            .all(|check| check.status != Status::Error)
    }

    fn error(&mut self, tag: impl Into<String>, message: impl Into<String>) {
        self.checks.push(Checked::new(tag, Status::Error, message));
    }
}

/// Validate a presentation definition against the structural rules of the
/// specification: unique ids, predicate/filter coupling, parseable field
/// paths, resolvable schema URIs and well-formed submission requirements.
pub fn validate_definition(definition: &PresentationDefinition) -> ValidationReport {
    let mut report = ValidationReport::default();

    if definition.id().is_empty() {
        report.error("presentation_definition.id", "definition id must not be empty");
    }

    let mut seen_ids = HashSet::new();
    for (index, descriptor) in definition.input_descriptors().iter().enumerate() {
        let tag = format!("input_descriptors[{index}]");

        if descriptor.id().is_empty() {
            report.error(tag.clone(), "input descriptor id must not be empty");
        }
        if !seen_ids.insert(descriptor.id().to_string()) {
            report.error(
                tag.clone(),
                format!("input descriptor id {} is not unique", descriptor.id()),
            );
        }

        if let Some(schema) = descriptor.schema() {
            for entry in schema.iter() {
                if Url::parse(&entry.uri).is_err() {
                    report.error(
                        format!("{tag}.schema"),
                        format!("schema uri {} is not a valid URI", entry.uri),
                    );
                }
            }
        }

        for (field_index, field) in descriptor.constraints().fields().iter().enumerate() {
            let field_tag = format!("{tag}.constraints.fields[{field_index}]");

            if field.predicate().is_some() && field.filter().is_none() {
                report.error(
                    field_tag.clone(),
                    format!(
                        "field {} carries a predicate but no filter",
                        field.path().first()
                    ),
                );
            }

            if field.filter().is_some_and(|filter| filter.has_invalid_pattern()) {
                report.error(field_tag.clone(), "filter pattern is not a valid regex");
            }

            for path in field.path().iter() {
                if JsonPath::parse(path).is_err() {
                    report.error(
                        field_tag.clone(),
                        format!("field path {path} is not a valid JSONPath"),
                    );
                }
            }
        }
    }

    if let Some(requirements) = definition.submission_requirements() {
        let known_groups: HashSet<_> = definition.known_groups().into_iter().collect();
        for (index, requirement) in requirements.iter().enumerate() {
            validate_requirement(
                requirement,
                &known_groups,
                format!("submission_requirements[{index}]"),
                &mut report,
            );
        }
    }

    report
}

fn validate_requirement(
    requirement: &SubmissionRequirement,
    known_groups: &HashSet<String>,
    tag: String,
    report: &mut ValidationReport,
) {
    match requirement.base() {
        SubmissionRequirementBase::From { from, .. } => {
            if !known_groups.contains(from) {
                report.error(
                    tag.clone(),
                    format!("requirement references group {from} that no input descriptor carries"),
                );
            }
        }
        SubmissionRequirementBase::FromNested { from_nested, .. } => {
            if from_nested.is_empty() {
                report.error(tag.clone(), "from_nested must not be empty");
            }
            for (index, nested) in from_nested.iter().enumerate() {
                validate_requirement(
                    nested,
                    known_groups,
                    format!("{tag}.from_nested[{index}]"),
                    report,
                );
            }
        }
    }

    if let SubmissionRequirement::Pick(pick) = requirement {
        if let (Some(min), Some(max)) = (pick.min, pick.max) {
            if min > max {
                report.error(tag.clone(), format!("pick min {min} exceeds max {max}"));
            }
        }
        if pick.count.is_none() && pick.min.is_none() && pick.max.is_none() {
            report.error(tag, "pick rule needs a count, min or max");
        }
    }
}

/// Validate a presentation submission: non-empty identifiers and resolvable
/// descriptor map paths.
pub fn validate_submission(submission: &PresentationSubmission) -> ValidationReport {
    let mut report = ValidationReport::default();

    if submission.definition_id().is_empty() {
        report.error(
            "presentation_submission.definition_id",
            "definition id must not be empty",
        );
    }

    for (index, entry) in submission.descriptor_map().iter().enumerate() {
        let tag = format!("descriptor_map[{index}]");

        if entry.id().is_empty() {
            report.error(tag.clone(), "descriptor map id must not be empty");
        }

        let mut nested = Some(entry);
        while let Some(map) = nested {
            if JsonPath::parse(map.path()).is_err() {
                report.error(
                    tag.clone(),
                    format!("descriptor map path {} is not a valid JSONPath", map.path()),
                );
            }
            nested = map.path_nested();
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::presentation_submission::DescriptorMap;

    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn well_formed_definition_passes() {
        let definition = PresentationDefinition::from_json(json!({
            "id": "ok",
            "input_descriptors": [
                {
                    "id": "a",
                    "group": ["A"],
                    "constraints": {
                        "fields": [
                            {
                                "path": ["$.credentialSubject.age"],
                                "filter": { "type": "number", "minimum": 18 },
                                "predicate": "preferred"
                            }
                        ]
                    }
                }
            ],
            "submission_requirements": [
                { "rule": "pick", "count": 1, "from": "A" }
            ]
        }))
        .unwrap();

        assert!(validate_definition(&definition).is_valid());
    }

    #[test]
    fn predicate_without_filter_is_flagged() {
        let definition = PresentationDefinition::from_json(json!({
            "id": "bad",
            "input_descriptors": [
                {
                    "id": "a",
                    "constraints": {
                        "fields": [
                            { "path": ["$.credentialSubject.age"], "predicate": "required" }
                        ]
                    }
                }
            ]
        }))
        .unwrap();

        let report = validate_definition(&definition);
        assert!(!report.is_valid());
        assert!(report.checks()[0].message.contains("predicate"));
    }

    #[test]
    fn duplicate_descriptor_ids_are_flagged() {
        let definition = PresentationDefinition::from_json(json!({
            "id": "dup",
            "input_descriptors": [
                { "id": "a", "constraints": {} },
                { "id": "a", "constraints": {} }
            ]
        }))
        .unwrap();

        assert!(!validate_definition(&definition).is_valid());
    }

    #[test]
    fn unknown_requirement_group_is_flagged() {
        let definition = PresentationDefinition::from_json(json!({
            "id": "groups",
            "input_descriptors": [
                { "id": "a", "group": ["A"], "constraints": {} }
            ],
            "submission_requirements": [
                { "rule": "all", "from": "B" }
            ]
        }))
        .unwrap();

        let report = validate_definition(&definition);
        assert!(!report.is_valid());
        assert!(report.checks()[0].message.contains("group B"));
    }

    #[test]
    fn submission_paths_must_parse() {
        let submission = PresentationSubmission::new(
            Uuid::nil(),
            "definition".into(),
            vec![
                DescriptorMap::new("a", "ldp_vc", "$.verifiableCredential[0]".into()),
                DescriptorMap::new("b", "ldp_vc", "$[".into()),
            ],
        );

        let report = validate_submission(&submission);
        assert!(!report.is_valid());
        assert_eq!(report.checks().len(), 1);
    }
}
