use super::{credential_format::ClaimFormatMap, filter::Filter};

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Name of a descriptor group, referenced by submission requirements.
pub type GroupId = String;

/// A JSONPath expression in its wire form.
pub type JsonPath = String;

/// A list the exchange format forbids from being empty.
///
/// Field `path` arrays, v1 `schema` lists and the `field_id` arrays of the
/// relational constraints all need at least one entry to mean anything;
/// deserializing an empty array fails instead of producing a constraint that
/// could never be evaluated. The first entry is always present, so
/// [`NonEmpty::first`] needs no `Option`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
pub struct NonEmpty<T: Clone>(Vec<T>);

impl<T: Clone> NonEmpty<T> {
    pub fn one(value: T) -> Self {
        Self(vec![value])
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    /// The leading entry, guaranteed by construction.
    pub fn first(&self) -> &T {
        &self.0[0]
    }
}

impl<T: Clone> TryFrom<Vec<T>> for NonEmpty<T> {
    type Error = Error;

    fn try_from(values: Vec<T>) -> Result<Self, Error> {
        if values.is_empty() {
            bail!("at least one entry is required")
        }
        Ok(Self(values))
    }
}

impl<T: Clone> From<NonEmpty<T>> for Vec<T> {
    fn from(NonEmpty(values): NonEmpty<T>) -> Vec<T> {
        values
    }
}

impl<T: Clone> AsRef<[T]> for NonEmpty<T> {
    fn as_ref(&self) -> &[T] {
        &self.0
    }
}

impl<T: Clone> Deref for NonEmpty<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// How strongly a constraint directive binds.
///
/// `limit_disclosure`, `subject_is_issuer`, `is_holder`, `same_subject` and
/// the predicate feature all grade themselves with this pair: violating a
/// `required` directive disqualifies the candidate, violating a `preferred`
/// one downgrades the outcome to a warning.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Optionality {
    Required,
    Preferred,
}

/// One entry of a v1 `schema` list: a resource the credential is expected to
/// conform to. Entries marked `required` must all be matched; unmarked
/// entries are alternatives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SchemaEntry {
    pub uri: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

/// A directive aimed at constraint fields by their `id`, used by the
/// `is_holder` and `same_subject` relational features.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FieldIdDirective {
    field_id: NonEmpty<String>,
    directive: Optionality,
}

impl FieldIdDirective {
    pub fn new(field_id: NonEmpty<String>, directive: Optionality) -> Self {
        Self {
            field_id,
            directive,
        }
    }

    pub fn field_ids(&self) -> &NonEmpty<String> {
        &self.field_id
    }

    pub fn directive(&self) -> Optionality {
        self.directive
    }
}

/// One requirement within a presentation definition: the constraints a
/// credential must satisfy to serve it, plus the v1 `schema` list or v2
/// `format` map typing the credentials it accepts.
///
/// Every input descriptor must be satisfied unless submission requirements
/// group them into looser rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InputDescriptor {
    id: String,
    #[serde(default)]
    constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(default, skip_serializing_if = "ClaimFormatMap::is_empty")]
    format: ClaimFormatMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    group: Vec<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<NonEmpty<SchemaEntry>>,
}

impl InputDescriptor {
    /// The id must be unique within the enclosing definition; evaluation
    /// results and descriptor maps refer to descriptors by it.
    pub fn new(id: String, constraints: Constraints) -> Self {
        Self {
            id,
            constraints,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// A human-readable explanation of why the claims are requested.
    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    /// Restrict this descriptor to a subset of the definition's accepted
    /// claim formats.
    pub fn set_format(mut self, format: ClaimFormatMap) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> &ClaimFormatMap {
        &self.format
    }

    /// The groups this descriptor belongs to, for submission requirements to
    /// pick from.
    pub fn set_group(mut self, group: Vec<GroupId>) -> Self {
        self.group = group;
        self
    }

    pub fn groups(&self) -> &Vec<GroupId> {
        self.group.as_ref()
    }

    /// Attach a v1 schema list; doing so marks the whole definition as v1.
    pub fn set_schema(mut self, schema: NonEmpty<SchemaEntry>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn schema(&self) -> Option<&NonEmpty<SchemaEntry>> {
        self.schema.as_ref()
    }
}

/// The constraint block of an input descriptor: field constraints plus the
/// disclosure and relational directives.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<ConstraintsField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_disclosure: Option<Optionality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_is_issuer: Option<Optionality>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    is_holder: Vec<FieldIdDirective>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    same_subject: Vec<FieldIdDirective>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, field: ConstraintsField) -> Self {
        self.fields.push(field);
        self
    }

    /// The field constraints, evaluated in order against each candidate.
    pub fn fields(&self) -> &Vec<ConstraintsField> {
        self.fields.as_ref()
    }

    /// Ask for the submitted claim data to be reduced to the constraint
    /// fields. Honoring it takes a selective-disclosure signature suite.
    pub fn set_limit_disclosure(mut self, limit_disclosure: Optionality) -> Self {
        self.limit_disclosure = Some(limit_disclosure);
        self
    }

    pub fn limit_disclosure(&self) -> Option<Optionality> {
        self.limit_disclosure
    }

    /// Require the candidate credential to be self-issued.
    pub fn set_subject_is_issuer(mut self, subject_is_issuer: Optionality) -> Self {
        self.subject_is_issuer = Some(subject_is_issuer);
        self
    }

    pub fn subject_is_issuer(&self) -> Option<Optionality> {
        self.subject_is_issuer
    }

    /// Require the subject of the referenced fields to be a DID the wallet
    /// controls.
    pub fn add_is_holder(mut self, directive: FieldIdDirective) -> Self {
        self.is_holder.push(directive);
        self
    }

    pub fn is_holder(&self) -> &[FieldIdDirective] {
        &self.is_holder
    }

    /// Require the credentials mapped to the referenced fields to agree on
    /// one subject.
    pub fn add_same_subject(mut self, directive: FieldIdDirective) -> Self {
        self.same_subject.push(directive);
        self
    }

    pub fn same_subject(&self) -> &[FieldIdDirective] {
        &self.same_subject
    }
}

/// One field constraint: where to look in the credential (JSONPath
/// alternatives, first hit wins), and optionally what the value found there
/// must satisfy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConstraintsField {
    path: NonEmpty<JsonPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<Optionality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    intent_to_retain: bool,
}

impl ConstraintsField {
    pub fn new(path: JsonPath) -> ConstraintsField {
        ConstraintsField {
            path: NonEmpty::one(path),
            id: None,
            purpose: None,
            name: None,
            predicate: None,
            filter: None,
            optional: None,
            intent_to_retain: false,
        }
    }

    /// Add an alternative JSONPath tried when the earlier ones find nothing.
    pub fn add_path(mut self, path: JsonPath) -> Self {
        self.path.push(path);
        self
    }

    pub fn path(&self) -> &NonEmpty<JsonPath> {
        &self.path
    }

    /// An id other constraints (`is_holder`, `same_subject`) can reference.
    /// Must be unique across the whole definition.
    pub fn set_id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    pub fn set_purpose(mut self, purpose: String) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn purpose(&self) -> Option<&String> {
        self.purpose.as_ref()
    }

    pub fn set_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// The filter the extracted value is run through.
    pub fn set_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Ask for the Boolean outcome of the filter instead of the value; a
    /// predicate without a filter is rejected by definition validation.
    pub fn set_predicate(mut self, predicate: Optionality) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn predicate(&self) -> Option<Optionality> {
        self.predicate
    }

    /// An optional field that finds no value is recorded as informational
    /// rather than failing the candidate.
    pub fn set_optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    /// Flag the verifier's intent to store the field value after
    /// presentation. Carried through untouched by evaluation.
    pub fn set_retained(mut self, intent_to_retain: bool) -> Self {
        self.intent_to_retain = intent_to_retain;
        self
    }

    pub fn intent_to_retain(&self) -> bool {
        self.intent_to_retain
    }
}
