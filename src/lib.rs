//! This library implements the evaluation core of [DIF Presentation Exchange].
//!
//! [DIF Presentation Exchange]: <https://identity.foundation/presentation-exchange/spec/v2.0.0/>
//!
//! Given a presentation definition — a verifier's machine-readable statement
//! of what credentials and fields a holder must present — and a set of
//! candidate verifiable credentials, the library decides which credentials
//! satisfy which input descriptors, optionally produces a limited-disclosure
//! view of each selected credential, and emits a presentation submission
//! mapping descriptors to the chosen credentials.
//!
//! # Usage
//!
//! The entry points live on the stateless [`PresentationExchange`] facade:
//!
//! ```ignore
//! use pex::{EvaluationOptions, PresentationExchange};
//! use pex::core::presentation_definition::PresentationDefinition;
//!
//! let pex = PresentationExchange::new();
//! let definition = PresentationDefinition::from_json(definition_json)?;
//!
//! // Check the definition before evaluating against it.
//! let report = pex.validate_definition(&definition);
//! assert!(report.is_valid());
//!
//! let options = EvaluationOptions::new()
//!     .set_holder_dids(vec!["did:example:holder".into()])
//!     .set_limit_disclosure_signature_suites(vec!["BbsBlsSignature2020".into()]);
//!
//! // Which wallet credentials can serve the definition?
//! let selection = pex.select_from(&definition, &credentials, &options)?;
//!
//! // Full evaluation: per-descriptor verdicts plus a synthesized submission.
//! let results = pex.evaluate_credentials(&definition, &credentials, &options)?;
//!
//! // Assemble and sign a presentation via an async signing callback.
//! let vp = pex
//!     .verifiable_presentation_from(&definition, &credentials, &signer, &options)
//!     .await?;
//! ```
//!
//! # Evaluation model
//!
//! Evaluation is a chain of handlers over an append-only result log, run by a
//! fresh [`evaluation::EvaluationClient`] per call. Each handler reads the
//! results of earlier stages and appends its own, keyed by
//! `(input descriptor path, credential path)`; the final verdict for a pair
//! is the maximum severity recorded for it. The chain order is fixed and
//! observable through the evaluator names in the log — see
//! [`evaluation::handlers::handler_chain`].
//!
//! Constraint violations are collected, never thrown: evaluation is total
//! over well-formed inputs, and only malformed inputs (a credential that is
//! neither JWT string nor JSON object, an unparseable JSONPath in the
//! definition) surface as errors.
//!
//! # Credential envelopes
//!
//! Credentials may arrive as JSON-LD objects or as compact VC-JWT strings;
//! [`core::credential::WrappedCredential`] normalizes both into one decoded
//! claim view, so a single JSONPath such as `$.credentialSubject.age`
//! addresses either envelope. Cryptographic verification and signing stay
//! outside this crate: signing is reached through the async
//! [`presentation::PresentationSigner`] callback, and proof types are treated
//! as opaque suite names.

pub mod core;
pub mod evaluation;
pub mod presentation;
pub mod selection;
pub mod validation;

mod exchange;

pub use exchange::{EvaluationOptions, PresentationExchange};
pub use serde_json_path::JsonPath;
