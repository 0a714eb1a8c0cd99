pub mod client;
pub mod handlers;
pub mod results;

pub use client::EvaluationClient;
pub use results::{Checked, EvaluationResults, HandlerCheckResult, Status};
