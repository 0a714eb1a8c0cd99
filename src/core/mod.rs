pub mod credential;
pub mod credential_format;
pub mod filter;
pub mod input_descriptor;
pub mod jsonpath;
pub mod presentation_definition;
pub mod presentation_submission;
