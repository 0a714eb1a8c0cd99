mod did_restriction;
mod format_restriction;
mod input_descriptor_filter;
mod is_holder;
mod limit_disclosure;
mod mark_for_submission;
mod predicate_related_field;
mod same_subject;
mod subject_is_issuer;
mod uri_evaluation;

pub use did_restriction::DidRestrictionHandler;
pub use format_restriction::FormatRestrictionHandler;
pub use input_descriptor_filter::InputDescriptorFilterHandler;
pub use is_holder::IsHolderHandler;
pub use limit_disclosure::LimitDisclosureHandler;
pub use mark_for_submission::MarkForSubmissionHandler;
pub use predicate_related_field::PredicateRelatedFieldHandler;
pub use same_subject::SameSubjectHandler;
pub use subject_is_issuer::SubjectIsIssuerHandler;
pub use uri_evaluation::UriEvaluationHandler;

use crate::core::presentation_definition::PresentationDefinition;

use super::client::EvaluationClient;

use anyhow::Result;

pub const URI_EVALUATION: &str = "UriEvaluation";
pub const FORMAT_RESTRICTION: &str = "FormatRestriction";
pub const DID_RESTRICTION: &str = "DIDRestriction";
pub const FILTER_EVALUATION: &str = "FilterEvaluation";
pub const PREDICATE_RELATED_FIELD: &str = "PredicateRelatedField";
pub const LIMIT_DISCLOSURE: &str = "LimitDisclosure";
pub const SUBJECT_IS_ISSUER: &str = "SubjectIsIssuer";
pub const IS_HOLDER: &str = "IsHolder";
pub const SAME_SUBJECT: &str = "SameSubject";
pub const MARK_FOR_SUBMISSION: &str = "MarkForSubmission";

/// One stage of the evaluation chain.
///
/// A handler reads the results appended by earlier stages and appends its
/// own; it never removes or rewrites entries. Results within a handler are
/// appended in `(descriptor index, credential index)` order.
pub trait EvaluationHandler {
    /// The evaluator name recorded on every result the handler appends.
    fn name(&self) -> &'static str;

    fn handle(
        &self,
        definition: &PresentationDefinition,
        client: &mut EvaluationClient,
    ) -> Result<()>;
}

/// The evaluation chain in its fixed, observable order. Order is data: the
/// sequence below is the only place it is defined.
pub fn handler_chain() -> Vec<Box<dyn EvaluationHandler>> {
    vec![
        Box::new(UriEvaluationHandler),
        Box::new(FormatRestrictionHandler),
        Box::new(DidRestrictionHandler),
        Box::new(InputDescriptorFilterHandler),
        Box::new(PredicateRelatedFieldHandler),
        Box::new(LimitDisclosureHandler),
        Box::new(SubjectIsIssuerHandler),
        Box::new(IsHolderHandler),
        Box::new(SameSubjectHandler),
        Box::new(MarkForSubmissionHandler),
    ]
}
