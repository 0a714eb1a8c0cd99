//! Submission requirement resolution and credential assignment.
//!
//! Operates on the candidate matrix produced by the evaluation chain: for
//! each input descriptor, the indices of the credentials its
//! MarkForSubmission verdict deemed eligible.

use std::collections::BTreeSet;

use crate::core::presentation_definition::{
    PresentationDefinition, SubmissionRequirement, SubmissionRequirementBase,
    SubmissionRequirementPick,
};
use crate::evaluation::results::{input_descriptor_path, Checked, Status};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The result of resolving submission requirements and assigning credentials
/// to descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    /// The descriptor indices that must appear in the submission, in
    /// declaration order.
    pub required: Vec<usize>,
    /// The chosen `(descriptor index, credential index)` assignment, in
    /// declaration order. Empty when `errors` is non-empty.
    pub chosen: Vec<(usize, usize)>,
    pub errors: Vec<Checked>,
}

/// Resolve the definition's submission requirements against the candidate
/// matrix and compute a minimal credential assignment.
///
/// Without submission requirements every descriptor must be satisfied.
/// The assignment search is a deterministic backtracking over descriptors in
/// declaration order, trying candidates by ascending credential index and
/// minimizing the number of distinct credentials.
pub fn resolve(
    definition: &PresentationDefinition,
    candidates: &[Vec<usize>],
) -> SelectionOutcome {
    let mut errors = Vec::new();

    let required = match definition.submission_requirements() {
        None => {
            for (index, descriptor) in definition.input_descriptors().iter().enumerate() {
                if candidates[index].is_empty() {
                    errors.push(Checked::new(
                        input_descriptor_path(index),
                        Status::Error,
                        format!(
                            "Input descriptor {} is not satisfied by any credential",
                            descriptor.id()
                        ),
                    ));
                }
            }
            (0..definition.input_descriptors().len()).collect()
        }
        Some(requirements) => {
            let mut required = Vec::new();
            for (index, requirement) in requirements.iter().enumerate() {
                match resolve_requirement(requirement, definition, candidates) {
                    Ok(descriptors) => required.extend(descriptors),
                    Err(message) => errors.push(Checked::new(
                        requirement_tag(requirement, index),
                        Status::Error,
                        message,
                    )),
                }
            }
            required.sort_unstable();
            required.dedup();
            required
        }
    };

    if !errors.is_empty() {
        return SelectionOutcome {
            required,
            chosen: Vec::new(),
            errors,
        };
    }

    match assign(&required, candidates) {
        Some(picks) => SelectionOutcome {
            chosen: required.iter().copied().zip(picks).collect(),
            required,
            errors,
        },
        // Unreachable in practice: an unsatisfiable descriptor is reported
        // during requirement resolution.
        None => SelectionOutcome {
            required,
            chosen: Vec::new(),
            errors: vec![Checked::new(
                "submission_requirements",
                Status::Error,
                "no credential assignment satisfies the submission requirements",
            )],
        },
    }
}

fn requirement_tag(requirement: &SubmissionRequirement, index: usize) -> String {
    match requirement.name() {
        Some(name) => format!("submission_requirements.{name}"),
        None => format!("submission_requirements[{index}]"),
    }
}

fn requirement_label(requirement: &SubmissionRequirement, base: &SubmissionRequirementBase) -> String {
    match (requirement.name(), base) {
        (Some(name), _) => format!("submission requirement {name}"),
        (None, SubmissionRequirementBase::From { from, .. }) => {
            format!("submission requirement over group {from}")
        }
        (None, SubmissionRequirementBase::FromNested { .. }) => {
            "nested submission requirement".to_string()
        }
    }
}

/// Resolve one requirement to the descriptor indices it puts into the
/// submission, or a message naming why it cannot be satisfied.
fn resolve_requirement(
    requirement: &SubmissionRequirement,
    definition: &PresentationDefinition,
    candidates: &[Vec<usize>],
) -> Result<Vec<usize>, String> {
    match requirement {
        SubmissionRequirement::All(base) => match base {
            SubmissionRequirementBase::From { from, .. } => {
                let members = definition.group_member_indices(from);
                if members.is_empty() {
                    return Err(format!(
                        "{} references group {from} with no input descriptors",
                        requirement_label(requirement, base)
                    ));
                }
                if let Some(&unsatisfied) =
                    members.iter().find(|&&member| candidates[member].is_empty())
                {
                    return Err(format!(
                        "{}: input descriptor {} has no eligible credential",
                        requirement_label(requirement, base),
                        definition.input_descriptors()[unsatisfied].id()
                    ));
                }
                Ok(members)
            }
            SubmissionRequirementBase::FromNested { from_nested, .. } => {
                let mut descriptors = Vec::new();
                for nested in from_nested {
                    descriptors.extend(resolve_requirement(nested, definition, candidates)?);
                }
                Ok(descriptors)
            }
        },
        SubmissionRequirement::Pick(pick) => resolve_pick(requirement, pick, definition, candidates),
    }
}

fn resolve_pick(
    requirement: &SubmissionRequirement,
    pick: &SubmissionRequirementPick,
    definition: &PresentationDefinition,
    candidates: &[Vec<usize>],
) -> Result<Vec<usize>, String> {
    // Each unit is one satisfiable alternative: a group member for `from`,
    // a nested requirement for `from_nested`.
    let units: Vec<Vec<usize>> = match &pick.submission_requirement {
        SubmissionRequirementBase::From { from, .. } => definition
            .group_member_indices(from)
            .into_iter()
            .filter(|&member| !candidates[member].is_empty())
            .map(|member| vec![member])
            .collect(),
        SubmissionRequirementBase::FromNested { from_nested, .. } => from_nested
            .iter()
            .filter_map(|nested| resolve_requirement(nested, definition, candidates).ok())
            .collect(),
    };

    let available = units.len();
    let label = requirement_label(requirement, &pick.submission_requirement);

    if let Some(count) = pick.count {
        if available < count {
            return Err(format!(
                "{label}: picked {available} of the {count} required entries"
            ));
        }
        return Ok(units.into_iter().take(count).flatten().collect());
    }

    let min = pick.min.unwrap_or(0);
    if available < min {
        return Err(format!(
            "{label}: picked {available} entries, fewer than the minimum of {min}"
        ));
    }
    let take = pick.max.map_or(available, |max| max.min(available));
    Ok(units.into_iter().take(take).flatten().collect())
}

/// Deterministic branch-and-bound over descriptors in declaration order,
/// minimizing the number of distinct credentials; among assignments with the
/// same distinct count, the first one found (candidates tried by ascending
/// credential index) wins.
fn assign(required: &[usize], candidates: &[Vec<usize>]) -> Option<Vec<usize>> {
    struct Search<'a> {
        required: &'a [usize],
        candidates: &'a [Vec<usize>],
        best: Option<Vec<usize>>,
        best_distinct: usize,
    }

    impl Search<'_> {
        fn dfs(&mut self, position: usize, picks: &mut Vec<usize>, used: &mut BTreeSet<usize>) {
            if used.len() >= self.best_distinct {
                return;
            }
            if position == self.required.len() {
                self.best_distinct = used.len();
                self.best = Some(picks.clone());
                return;
            }

            let options = self.candidates[self.required[position]].clone();
            for credential in options {
                let inserted = used.insert(credential);
                picks.push(credential);
                self.dfs(position + 1, picks, used);
                picks.pop();
                if inserted {
                    used.remove(&credential);
                }
            }
        }
    }

    let mut search = Search {
        required,
        candidates,
        best: None,
        best_distinct: usize::MAX,
    };
    search.dfs(0, &mut Vec::with_capacity(required.len()), &mut BTreeSet::new());
    search.best
}

/// One satisfiable input descriptor and the paths of the credentials that can
/// serve it, rooted at the input credential set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorMatch {
    pub id: String,
    pub vc_path: Vec<String>,
}

/// The outcome of `select_from`: which credentials the wallet can present to
/// satisfy the definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectResults {
    pub are_required_credentials_present: Status,
    pub matches: Vec<DescriptorMatch>,
    /// The selectable credentials, with disclosure projections applied.
    pub verifiable_credential: Vec<Value>,
    pub warnings: Vec<Checked>,
    pub errors: Vec<Checked>,
}
