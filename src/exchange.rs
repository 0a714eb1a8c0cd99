use crate::core::credential::WrappedCredential;
use crate::core::credential_format::ClaimFormatMap;
use crate::core::jsonpath::{parse_concrete_path, PathSegment};
use crate::core::presentation_definition::PresentationDefinition;
use crate::core::presentation_submission::{DescriptorMap, PresentationSubmission};
use crate::evaluation::client::EvaluationClient;
use crate::evaluation::results::{
    verifiable_credential_path, Checked, EvaluationResults, HandlerCheckResult, Status,
};
use crate::presentation::{
    assemble_presentation, PresentationResult, PresentationSigner, PresentationSubmissionLocation,
    VerifiablePresentationResult,
};
use crate::selection::{self, DescriptorMatch, SelectResults};
use crate::validation::{self, ValidationReport};

use anyhow::{bail, Result};
use serde_json::Value;
use uuid::Uuid;

/// Options recognized by the evaluation entry points.
///
/// All options default to "off"; setters follow the builder style.
#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    holder_dids: Vec<String>,
    limit_disclosure_signature_suites: Vec<String>,
    restrict_to_formats: Option<ClaimFormatMap>,
    restrict_to_did_methods: Vec<String>,
    presentation_submission: Option<PresentationSubmission>,
    generate_presentation_submission: bool,
    presentation_submission_location: PresentationSubmissionLocation,
    submission_id: Option<Uuid>,
    holder: Option<String>,
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The DIDs the wallet controls, consulted by the holder-binding checks.
    pub fn set_holder_dids(mut self, holder_dids: Vec<String>) -> Self {
        self.holder_dids = holder_dids;
        self
    }

    pub fn holder_dids(&self) -> &[String] {
        &self.holder_dids
    }

    /// The proof types that support selective disclosure, e.g.
    /// `BbsBlsSignature2020`.
    pub fn set_limit_disclosure_signature_suites(mut self, suites: Vec<String>) -> Self {
        self.limit_disclosure_signature_suites = suites;
        self
    }

    pub fn limit_disclosure_signature_suites(&self) -> &[String] {
        &self.limit_disclosure_signature_suites
    }

    /// A caller-imposed format allow-list, intersected with the definition's.
    pub fn set_restrict_to_formats(mut self, formats: ClaimFormatMap) -> Self {
        self.restrict_to_formats = Some(formats);
        self
    }

    pub fn restrict_to_formats(&self) -> Option<&ClaimFormatMap> {
        self.restrict_to_formats.as_ref()
    }

    /// An allow-list of DID methods the issuer must use.
    pub fn set_restrict_to_did_methods(mut self, methods: Vec<String>) -> Self {
        self.restrict_to_did_methods = methods;
        self
    }

    pub fn restrict_to_did_methods(&self) -> &[String] {
        &self.restrict_to_did_methods
    }

    /// A pre-existing submission to evaluate against instead of generating
    /// one.
    pub fn set_presentation_submission(mut self, submission: PresentationSubmission) -> Self {
        self.presentation_submission = Some(submission);
        self
    }

    pub fn presentation_submission(&self) -> Option<&PresentationSubmission> {
        self.presentation_submission.as_ref()
    }

    /// Force generation of a submission even when one is embedded in the
    /// evaluated presentation.
    pub fn set_generate_presentation_submission(mut self, generate: bool) -> Self {
        self.generate_presentation_submission = generate;
        self
    }

    pub fn generate_presentation_submission(&self) -> bool {
        self.generate_presentation_submission
    }

    pub fn set_presentation_submission_location(
        mut self,
        location: PresentationSubmissionLocation,
    ) -> Self {
        self.presentation_submission_location = location;
        self
    }

    pub fn presentation_submission_location(&self) -> PresentationSubmissionLocation {
        self.presentation_submission_location
    }

    /// The id for generated submissions. A fresh v4 UUID is used when absent.
    pub fn set_submission_id(mut self, id: Uuid) -> Self {
        self.submission_id = Some(id);
        self
    }

    pub fn submission_id(&self) -> Option<Uuid> {
        self.submission_id
    }

    /// The holder DID recorded on assembled presentations.
    pub fn set_holder(mut self, holder: String) -> Self {
        self.holder = Some(holder);
        self
    }

    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }
}

/// The Presentation Exchange evaluation facade.
///
/// Stateless: every call constructs a fresh evaluation client and drops it
/// with the call, so one instance can serve any number of evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationExchange;

impl PresentationExchange {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a credential set against a presentation definition.
    ///
    /// Constraint violations are collected into the returned results; only
    /// malformed inputs (a non-JSON credential, an unparseable JSONPath in
    /// the definition) surface as errors.
    pub fn evaluate_credentials(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
        options: &EvaluationOptions,
    ) -> Result<EvaluationResults> {
        let client = self.run_evaluation(definition, credentials, options)?;
        Ok(self.results_from(definition, &client, options))
    }

    /// Evaluate a verifiable presentation against a presentation definition.
    ///
    /// A `presentation_submission` embedded in the presentation is honored
    /// unless the options force regeneration or carry their own submission.
    pub fn evaluate_presentation(
        &self,
        definition: &PresentationDefinition,
        presentation: &Value,
        options: &EvaluationOptions,
    ) -> Result<EvaluationResults> {
        let credentials = match presentation.get("verifiableCredential") {
            Some(Value::Array(credentials)) => credentials.clone(),
            Some(credential @ (Value::Object(_) | Value::String(_))) => vec![credential.clone()],
            _ => bail!("presentation carries no verifiableCredential"),
        };

        let mut options = options.clone();
        if options.presentation_submission.is_none() && !options.generate_presentation_submission {
            if let Some(embedded) = presentation.get("presentation_submission") {
                options.presentation_submission =
                    Some(PresentationSubmission::from_json(embedded.clone())?);
            }
        }

        self.evaluate_credentials(definition, &credentials, &options)
    }

    /// Determine which credentials of a wallet can satisfy a definition.
    pub fn select_from(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
        options: &EvaluationOptions,
    ) -> Result<SelectResults> {
        let client = self.run_evaluation(definition, credentials, options)?;

        let candidates = client.candidate_matrix(definition.input_descriptors().len());
        let outcome = selection::resolve(definition, &candidates);

        let matches = outcome
            .required
            .iter()
            .map(|&descriptor_index| DescriptorMatch {
                id: definition.input_descriptors()[descriptor_index].id().to_string(),
                vc_path: candidates[descriptor_index]
                    .iter()
                    .map(|&credential_index| verifiable_credential_path(credential_index))
                    .collect(),
            })
            .collect();

        let mut errors = log_checked(client.results(), Status::Error);
        errors.extend(outcome.errors.iter().cloned());
        let warnings = log_checked(client.results(), Status::Warn);

        let (status, verifiable_credential) = if !outcome.errors.is_empty() {
            (Status::Error, client.verifiable_credential().to_vec())
        } else {
            let chosen_has_warning = outcome
                .chosen
                .iter()
                .any(|&(descriptor_index, credential_index)| {
                    client.pair_has_warning(descriptor_index, credential_index)
                });
            let mut selected = Vec::new();
            for &(_, credential_index) in &outcome.chosen {
                if !selected.contains(&credential_index) {
                    selected.push(credential_index);
                }
            }
            (
                if chosen_has_warning { Status::Warn } else { Status::Info },
                selected
                    .into_iter()
                    .map(|credential_index| client.verifiable_credential()[credential_index].clone())
                    .collect(),
            )
        };

        Ok(SelectResults {
            are_required_credentials_present: status,
            matches,
            verifiable_credential,
            warnings,
            errors,
        })
    }

    /// Synthesize a presentation submission for credentials already selected
    /// to satisfy the definition.
    pub fn presentation_submission_from(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
    ) -> Result<PresentationSubmission> {
        let results =
            self.evaluate_credentials(definition, credentials, &EvaluationOptions::new())?;

        match results.value {
            Some(submission) => Ok(submission),
            None => {
                let reason = results
                    .errors
                    .first()
                    .map(|error| error.message.clone())
                    .unwrap_or_else(|| "selected credentials do not satisfy the definition".into());
                bail!("submission synthesis failed: {reason}")
            }
        }
    }

    /// Evaluate, select and assemble an unsigned presentation.
    pub fn presentation_from(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
        options: &EvaluationOptions,
    ) -> Result<PresentationResult> {
        let results = self.evaluate_credentials(definition, credentials, options)?;

        let Some(submission) = results.value else {
            let reason = results
                .errors
                .first()
                .map(|error| error.message.clone())
                .unwrap_or_else(|| "credentials do not satisfy the definition".into());
            bail!("cannot assemble presentation: {reason}")
        };

        let location = options.presentation_submission_location();
        let presentation = assemble_presentation(
            &results.verifiable_credential,
            options.holder(),
            &submission,
            location,
        );

        Ok(PresentationResult {
            presentation,
            presentation_submission: submission,
            presentation_submission_location: location,
        })
    }

    /// Evaluate, assemble and sign a presentation.
    ///
    /// Evaluation completes synchronously first; the signing callback is then
    /// awaited and its output embedded verbatim.
    pub async fn verifiable_presentation_from(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
        signer: &dyn PresentationSigner,
        options: &EvaluationOptions,
    ) -> Result<VerifiablePresentationResult> {
        let result = self.presentation_from(definition, credentials, options)?;
        let verifiable_presentation = signer.sign(&result.presentation).await?;

        Ok(VerifiablePresentationResult {
            verifiable_presentation,
            presentation_submission: result.presentation_submission,
            presentation_submission_location: result.presentation_submission_location,
        })
    }

    /// Validate a presentation definition against its structural rules.
    pub fn validate_definition(&self, definition: &PresentationDefinition) -> ValidationReport {
        validation::validate_definition(definition)
    }

    /// Validate a presentation submission against its structural rules.
    pub fn validate_submission(&self, submission: &PresentationSubmission) -> ValidationReport {
        validation::validate_submission(submission)
    }

    fn run_evaluation(
        &self,
        definition: &PresentationDefinition,
        credentials: &[Value],
        options: &EvaluationOptions,
    ) -> Result<EvaluationClient> {
        let wrapped = credentials
            .iter()
            .map(WrappedCredential::from_json)
            .collect::<Result<Vec<_>>>()?;

        let mut client = EvaluationClient::new(options.clone(), wrapped);
        client.evaluate(definition)?;
        Ok(client)
    }

    fn results_from(
        &self,
        definition: &PresentationDefinition,
        client: &EvaluationClient,
        options: &EvaluationOptions,
    ) -> EvaluationResults {
        let mut errors = log_checked(client.results(), Status::Error);
        let warnings = log_checked(client.results(), Status::Warn);
        let candidates = client.candidate_matrix(definition.input_descriptors().len());

        if let Some(provided) = options.presentation_submission() {
            if !options.generate_presentation_submission() {
                return self.check_provided_submission(
                    definition, client, provided, errors, warnings,
                );
            }
        }

        let outcome = selection::resolve(definition, &candidates);
        if !outcome.errors.is_empty() {
            errors.extend(outcome.errors);
            return EvaluationResults {
                value: None,
                errors,
                warnings,
                verifiable_credential: client.verifiable_credential().to_vec(),
                are_required_credentials_present: Status::Error,
            };
        }

        // Rebase the chosen credentials onto the output list, in the order
        // the descriptor map first references them.
        let mut output_indices: Vec<usize> = Vec::new();
        let mut descriptor_map = Vec::new();
        for &(descriptor_index, credential_index) in &outcome.chosen {
            let position = output_indices
                .iter()
                .position(|&index| index == credential_index)
                .unwrap_or_else(|| {
                    output_indices.push(credential_index);
                    output_indices.len() - 1
                });

            descriptor_map.push(DescriptorMap::new(
                definition.input_descriptors()[descriptor_index].id(),
                client.credentials()[credential_index].format(),
                verifiable_credential_path(position),
            ));
        }

        let verifiable_credential = output_indices
            .iter()
            .map(|&credential_index| client.verifiable_credential()[credential_index].clone())
            .collect();

        let chosen_has_warning = outcome
            .chosen
            .iter()
            .any(|&(descriptor_index, credential_index)| {
                client.pair_has_warning(descriptor_index, credential_index)
            });

        let submission = PresentationSubmission::new(
            options.submission_id().unwrap_or_else(Uuid::new_v4),
            definition.id().clone(),
            descriptor_map,
        );

        EvaluationResults {
            value: Some(submission),
            errors,
            warnings,
            verifiable_credential,
            are_required_credentials_present: if chosen_has_warning {
                Status::Warn
            } else {
                Status::Info
            },
        }
    }

    /// Check a caller-provided submission against the evaluation verdicts:
    /// every descriptor map entry must reference an eligible pair.
    fn check_provided_submission(
        &self,
        definition: &PresentationDefinition,
        client: &EvaluationClient,
        provided: &PresentationSubmission,
        mut errors: Vec<Checked>,
        warnings: Vec<Checked>,
    ) -> EvaluationResults {
        let mut all_eligible = true;
        let mut referenced_warning = false;

        for (index, entry) in provided.descriptor_map().iter().enumerate() {
            let tag = format!("descriptor_map[{index}]");

            let Some(descriptor_index) = definition
                .input_descriptors()
                .iter()
                .position(|descriptor| descriptor.id() == entry.id())
            else {
                all_eligible = false;
                errors.push(Checked::new(
                    tag,
                    Status::Error,
                    format!("descriptor map id {} matches no input descriptor", entry.id()),
                ));
                continue;
            };

            let Some(credential_index) = resolve_credential_index(entry.path()) else {
                all_eligible = false;
                errors.push(Checked::new(
                    tag,
                    Status::Error,
                    format!("descriptor map path {} cannot be resolved", entry.path()),
                ));
                continue;
            };

            if credential_index >= client.credential_count()
                || client.pair_has_error(descriptor_index, credential_index)
            {
                all_eligible = false;
                errors.push(Checked::new(
                    tag,
                    Status::Error,
                    format!(
                        "credential at {} does not satisfy input descriptor {}",
                        entry.path(),
                        entry.id()
                    ),
                ));
            } else if client.pair_has_warning(descriptor_index, credential_index) {
                referenced_warning = true;
            }
        }

        // Every descriptor the definition requires must be covered.
        for descriptor in definition.input_descriptors() {
            if definition.submission_requirements().is_none()
                && !provided
                    .descriptor_map()
                    .iter()
                    .any(|entry| entry.id() == descriptor.id())
            {
                all_eligible = false;
                errors.push(Checked::new(
                    "presentation_submission",
                    Status::Error,
                    format!(
                        "input descriptor {} is not covered by the submission",
                        descriptor.id()
                    ),
                ));
            }
        }

        EvaluationResults {
            value: Some(provided.clone()),
            errors,
            warnings,
            verifiable_credential: client.verifiable_credential().to_vec(),
            are_required_credentials_present: if !all_eligible {
                Status::Error
            } else if referenced_warning {
                Status::Warn
            } else {
                Status::Info
            },
        }
    }
}

/// Resolve a descriptor map path of the form `$.verifiableCredential[k]`.
fn resolve_credential_index(path: &str) -> Option<usize> {
    match parse_concrete_path(path).ok()?.as_slice() {
        [PathSegment::Key(key), PathSegment::Index(index)] if key == "verifiableCredential" => {
            Some(*index)
        }
        _ => None,
    }
}

/// Summarize log rows of one severity for the caller-facing result.
fn log_checked(results: &[HandlerCheckResult], status: Status) -> Vec<Checked> {
    results
        .iter()
        .filter(|result| result.status == status)
        .map(|result| {
            Checked::new(
                result.evaluator.clone(),
                status,
                format!(
                    "{} ({}, {})",
                    result.message, result.input_descriptor_path, result.verifiable_credential_path
                ),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_credential_index_accepts_only_the_credential_set_root() {
        assert_eq!(resolve_credential_index("$.verifiableCredential[2]"), Some(2));
        assert_eq!(resolve_credential_index("$['verifiableCredential'][0]"), Some(0));
        assert_eq!(resolve_credential_index("$.other[0]"), None);
        assert_eq!(resolve_credential_index("$.verifiableCredential"), None);
    }
}
