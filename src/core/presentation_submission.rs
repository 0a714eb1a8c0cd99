use super::credential_format::ClaimFormatDesignation;
use super::input_descriptor::JsonPath;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maps the input descriptors of a definition to the credentials chosen to
/// satisfy them.
///
/// A submission travels under a `presentation_submission` property of the
/// presentation (or next to it, for transports that attach it externally);
/// its descriptor map is how a verifier finds each requested claim inside
/// the holder's response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    id: Uuid,
    definition_id: String,
    descriptor_map: Vec<DescriptorMap>,
}

impl PresentationSubmission {
    /// `definition_id` names the presentation definition the submission
    /// answers; `id` is the caller-chosen UUID for this submission.
    pub fn new(id: Uuid, definition_id: String, descriptor_map: Vec<DescriptorMap>) -> Self {
        Self {
            id,
            definition_id,
            descriptor_map,
        }
    }

    /// Parse a submission from its JSON representation, e.g. one embedded in
    /// a presentation under evaluation.
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("failed to parse presentation submission")
    }

    /// Render the submission for embedding in a presentation.
    pub fn to_json(&self) -> Value {
        // Identifiers, paths and nested maps of the same; cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }

    /// The submission entries, one per satisfied input descriptor.
    pub fn descriptor_map(&self) -> &Vec<DescriptorMap> {
        &self.descriptor_map
    }
}

/// One submission entry: which input descriptor a credential answers, the
/// claim format of that credential, and the JSONPath locating it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    id: String,
    format: ClaimFormatDesignation,
    path: JsonPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_nested: Option<Box<DescriptorMap>>,
}

impl DescriptorMap {
    /// `id` matches an input descriptor of the definition; `path` is
    /// evaluated against the object the submission is embedded in, e.g.
    /// `$.verifiableCredential[0]` inside a presentation.
    pub fn new(
        id: impl Into<String>,
        format: impl Into<ClaimFormatDesignation>,
        path: JsonPath,
    ) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path,
            path_nested: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> &ClaimFormatDesignation {
        &self.format
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_nested(&self) -> Option<&DescriptorMap> {
        self.path_nested.as_deref()
    }

    /// Point into a value nested below `path`, for credentials wrapped in
    /// further envelopes. The nested entry answers the same descriptor, so
    /// its id is forced to the parent's.
    pub fn set_path_nested(mut self, mut path_nested: DescriptorMap) -> Self {
        path_nested.id.clone_from(&self.id);

        self.path_nested = Some(Box::new(path_nested));

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn submission_json_round_trip() {
        let value = json!({
            "id": "a30e3b91-fb77-4d22-95fa-871689c322e2",
            "definition_id": "32f54163-7166-48f1-93d8-ff217bdb0653",
            "descriptor_map": [
                {
                    "id": "banking_input_2",
                    "format": "jwt_vc",
                    "path": "$.verifiableCredential[0]"
                },
                {
                    "id": "citizenship_input_1",
                    "format": "ldp_vc",
                    "path": "$.verifiableCredential[1]"
                }
            ]
        });

        let submission = PresentationSubmission::from_json(value.clone()).unwrap();

        assert_eq!(submission.definition_id(), "32f54163-7166-48f1-93d8-ff217bdb0653");
        assert_eq!(submission.descriptor_map().len(), 2);
        assert_eq!(
            submission.descriptor_map()[0].format(),
            &ClaimFormatDesignation::jwt_vc()
        );
        assert_eq!(submission.to_json(), value);
    }

    #[test]
    fn malformed_submission_fails_to_parse() {
        assert!(PresentationSubmission::from_json(json!({ "id": "not-a-uuid" })).is_err());
    }

    #[test]
    fn path_nested_inherits_parent_id() {
        let map = DescriptorMap::new("employment_input", "jwt_vc", "$.verifiableCredential[0]".into())
            .set_path_nested(DescriptorMap::new("other", "jwt_vc", "$.vp.verifiableCredential[0]".into()));

        assert_eq!(map.path_nested().unwrap().id(), "employment_input");
    }
}
