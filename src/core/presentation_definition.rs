use super::credential_format::ClaimFormatMap;
use super::input_descriptor::{GroupId, InputDescriptor};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// The Presentation Exchange revision a definition conforms to.
///
/// Version discovery happens upstream; the evaluation core only consumes the
/// normalized tag. v1 descriptors type credentials through `schema` lists,
/// v2 descriptors through `format` maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdVersion {
    V1,
    #[default]
    V2,
}

/// A verifier's machine-readable statement of what a holder must present:
/// an ordered list of input descriptors, optional submission requirements
/// combining them into looser rules, and an optional format allow-list.
///
/// The evaluation core treats a definition as read-only; callers wanting to
/// amend one (say, push an extra v1 schema entry) do so before handing it in.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationDefinition {
    id: String,
    input_descriptors: Vec<InputDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission_requirements: Option<Vec<SubmissionRequirement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(default, skip_serializing_if = "ClaimFormatMap::is_empty")]
    format: ClaimFormatMap,
    #[serde(default, skip_serializing)]
    version: PdVersion,
}

impl PresentationDefinition {
    /// Build a v2 definition from its id and input descriptors.
    pub fn new(id: String, input_descriptors: Vec<InputDescriptor>) -> Self {
        Self {
            id,
            input_descriptors,
            ..Default::default()
        }
    }

    /// Parse a definition from its JSON representation, normalizing the
    /// version tag: any descriptor carrying a `schema` list marks the whole
    /// definition as v1.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let mut definition: Self = serde_json::from_value(value)
            .context("failed to parse presentation definition")?;

        if definition
            .input_descriptors
            .iter()
            .any(|descriptor| descriptor.schema().is_some())
        {
            definition.version = PdVersion::V1;
        }

        Ok(definition)
    }

    pub fn id(&self) -> &String {
        &self.id
    }

    pub fn version(&self) -> PdVersion {
        self.version
    }

    pub fn set_version(mut self, version: PdVersion) -> Self {
        self.version = version;
        self
    }

    /// The input descriptors, in declaration order. Result log paths and
    /// candidate matrices index into this list.
    pub fn input_descriptors(&self) -> &Vec<InputDescriptor> {
        &self.input_descriptors
    }

    pub fn set_submission_requirements(
        mut self,
        submission_requirements: Vec<SubmissionRequirement>,
    ) -> Self {
        self.submission_requirements = Some(submission_requirements);
        self
    }

    /// The selection rules over descriptor groups. Absent means every
    /// descriptor must be satisfied.
    pub fn submission_requirements(&self) -> Option<&Vec<SubmissionRequirement>> {
        self.submission_requirements.as_ref()
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// The definition-wide format allow-list; descriptors may narrow it
    /// with their own.
    pub fn set_format(mut self, format: ClaimFormatMap) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> &ClaimFormatMap {
        &self.format
    }

    /// Indices of the input descriptors belonging to a group.
    pub fn group_member_indices(&self, group: &GroupId) -> Vec<usize> {
        self.input_descriptors
            .iter()
            .enumerate()
            .filter(|(_, descriptor)| descriptor.groups().contains(group))
            .map(|(index, _)| index)
            .collect()
    }

    /// Every group name the input descriptors reference, deduplicated.
    pub fn known_groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self
            .input_descriptors
            .iter()
            .flat_map(|descriptor| descriptor.groups().iter().cloned())
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }
}

/// The name/purpose envelope shared by both submission requirement shapes.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubmissionRequirementObject {
    pub name: Option<String>,
    pub purpose: Option<String>,
    #[serde(flatten)]
    pub property_set: Option<Map<String, serde_json::Value>>,
}

/// What a requirement draws from: a descriptor group by name, or a list of
/// nested requirements.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SubmissionRequirementBase {
    From {
        from: GroupId,
        #[serde(flatten)]
        submission_requirement_base: SubmissionRequirementObject,
    },
    FromNested {
        from_nested: Vec<SubmissionRequirement>,
        #[serde(flatten)]
        submission_requirement_base: SubmissionRequirementObject,
    },
}

impl SubmissionRequirementBase {
    pub fn name(&self) -> Option<&String> {
        match self {
            Self::From {
                submission_requirement_base,
                ..
            }
            | Self::FromNested {
                submission_requirement_base,
                ..
            } => submission_requirement_base.name.as_ref(),
        }
    }
}

/// A selection rule over a descriptor group: `all` requires every member to
/// be satisfied, `pick` requires a count within the configured bounds
/// (`count`, or `min`/`max`).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SubmissionRequirement {
    All(SubmissionRequirementBase),
    Pick(SubmissionRequirementPick),
}

impl SubmissionRequirement {
    /// The requirement's source and envelope, independent of its rule.
    pub fn base(&self) -> &SubmissionRequirementBase {
        match self {
            Self::All(base) => base,
            Self::Pick(pick) => &pick.submission_requirement,
        }
    }

    /// The display name, used to label selection failures.
    pub fn name(&self) -> Option<&String> {
        self.base().name()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubmissionRequirementPick {
    #[serde(flatten)]
    pub submission_requirement: SubmissionRequirementBase,
    pub count: Option<usize>,
    pub min: Option<usize>,
    pub max: Option<usize>,
}
